//! Campaign domain module.

mod model;

pub use model::{Campaign, CampaignId, CampaignStatus};

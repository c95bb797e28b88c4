//! Idea domain module.
//!
//! # Module Structure
//!
//! - `model`: `Idea`, `IdeaDraft` and the contributor/document value types

mod model;

pub use model::{
    Contributor, ContributorRole, DocumentRef, ExpectedImpact, Idea, IdeaDraft, IdeaId,
    IdeaStatus, VirusScanStatus, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN,
};

//! Observable state containers for server-backed resources.
//!
//! # Module Structure
//!
//! - `lifecycle`: Tagged async progress (`Lifecycle`) and request sequencing
//! - `collection`: Paginated list state (`ResourceCollection`)
//! - `detail`: Single-entity focus state (`ResourceDetail`)
//!
//! Both containers apply settled results by issuance order, not by
//! completion order: a response that is older than what is already shown
//! is discarded.

mod collection;
mod detail;
mod lifecycle;

pub use collection::ResourceCollection;
pub use detail::ResourceDetail;
pub use lifecycle::{Generation, Lifecycle, RequestSeq, RequestSequencer, Settlement};

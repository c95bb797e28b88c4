//! Application layer of the IdeaHub client.
//!
//! Wires the Session Manager to the Resource Store that caches ideas,
//! campaigns and their related lists for the signed-in user.

pub mod mutation_guard;
pub mod resource_store;

pub use mutation_guard::{MutationGuard, MutationTicket};
pub use resource_store::ResourceStore;

//! Core domain of the IdeaHub client.
//!
//! Holds the entity models, the client state containers and the two
//! components that own session state: the Session Manager and the Access
//! Gate. Transport lives behind the [`gateway::ResourceGateway`] trait.

pub mod access;
pub mod campaign;
pub mod config;
pub mod error;
pub mod gateway;
pub mod idea;
pub mod pagination;
pub mod resource;
pub mod session;
pub mod user;

// Re-export common error types
pub use error::{GatewayError, HubError, Result};

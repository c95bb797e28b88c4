//! Transport layer of the IdeaHub client.
//!
//! Provides the HTTP implementation of
//! [`ideahub_core::gateway::ResourceGateway`].

pub mod http_gateway;

pub use http_gateway::HttpResourceGateway;

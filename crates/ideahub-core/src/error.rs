//! Error types for the IdeaHub client.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-level validation messages as returned by the server.
///
/// Keys are field names (`title`, `password`, `non_field_errors`, ...),
/// values are the messages for that field in server order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Field name used for messages that are not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Classified failure of a Resource Gateway call.
///
/// The gateway is the only place that decides the class of a failure.
/// Managers and stores record the message and never reinterpret it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayError {
    /// Missing, expired or invalid credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The addressed resource does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Structured 4xx rejection with per-field messages.
    #[error("Validation failed: {}", summarize_fields(.0))]
    Validation(FieldErrors),

    /// Transport failure, timeout or offline.
    #[error("Network error: {0}")]
    Network(String),

    /// Anything the gateway could not classify.
    #[error("Unexpected response{}: {message}", status_suffix(.status))]
    Unknown {
        status: Option<u16>,
        message: String,
    },
}

impl GatewayError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn unknown(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Unknown {
            status,
            message: message.into(),
        }
    }

    /// Builds a validation error carrying a single message for `field`.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::Validation(fields)
    }

    /// Returns the human-readable text the server sent, if any.
    ///
    /// For validation errors this is the first message, preferring
    /// `non_field_errors` over individual fields.
    pub fn server_message(&self) -> Option<&str> {
        let message = match self {
            Self::Unauthorized { message }
            | Self::NotFound { message }
            | Self::Unknown { message, .. } => message.as_str(),
            Self::Validation(fields) => {
                return fields
                    .get(NON_FIELD_ERRORS)
                    .and_then(|messages| messages.first())
                    .or_else(|| fields.values().flat_map(|m| m.first()).next())
                    .map(String::as_str);
            }
            Self::Network(_) => return None,
        };

        if message.trim().is_empty() {
            None
        } else {
            Some(message)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns the field messages of a validation error.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

fn summarize_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// A type alias for gateway results.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// The shared error type for the IdeaHub client.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum HubError {
    /// Classified failure from the Resource Gateway
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The same operation is already in flight for this state owner
    #[error("Operation already in progress: {operation}")]
    Busy { operation: String },

    /// Persistent session storage failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn busy(operation: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a client-side validation error for a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Gateway(GatewayError::field(field, message))
    }

    /// Creates the error returned when an authenticated operation runs
    /// without a session.
    pub fn not_authenticated() -> Self {
        Self::Gateway(GatewayError::unauthorized(
            "Authentication credentials were not provided.",
        ))
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_unauthorized())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_not_found())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_validation())
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Returns the gateway classification, if this error came from the gateway.
    pub fn as_gateway(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(e) => Some(e),
            _ => None,
        }
    }

    /// Message to show the user: the server's text when present,
    /// `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Gateway(e) => e.server_message().unwrap_or(fallback).to_string(),
            Self::Busy { .. } => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for HubError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, HubError>`.
pub type Result<T> = std::result::Result<T, HubError>;

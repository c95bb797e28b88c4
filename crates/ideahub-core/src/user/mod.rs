//! User domain module.
//!
//! This module contains the user identity model shared by the session layer
//! and the idea/contributor models.
//!
//! # Module Structure
//!
//! - `model`: Identity, registration and password change payloads
//!
//! # Usage
//!
//! ```ignore
//! use ideahub_core::user::{UserIdentity, UserId, Registration};
//! ```

mod model;

// Re-export public API
pub use model::{PasswordChange, Registration, UserId, UserIdentity};

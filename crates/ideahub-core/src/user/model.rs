//! User identity domain model.
//!
//! Mirrors the user representation the server returns from `/auth/users/me/`
//! and embeds in ideas and contributors.

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Server-side user identifier.
pub type UserId = i64;

/// The identity of an authenticated (or referenced) user.
///
/// After a plain login only `username` is known. The remaining fields are
/// filled in once the profile is fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
}

impl UserIdentity {
    /// Creates an identity that only knows the login name.
    pub fn from_username(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: None,
            first_name: None,
            last_name: None,
            is_staff: false,
        }
    }

    /// Returns "First Last" when both names are known, the username otherwise.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() || !last.is_empty() => {
                format!("{} {}", first, last).trim().to_string()
            }
            _ => self.username.clone(),
        }
    }
}

/// Account registration request.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(rename = "password2")]
    pub password_confirm: String,
}

impl Registration {
    /// Checks the constraints the server would reject anyway.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(HubError::validation("username", "This field may not be blank."));
        }
        if self.password != self.password_confirm {
            return Err(HubError::validation("password", "Passwords do not match."));
        }
        Ok(())
    }
}

/// Password change request.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    #[serde(rename = "new_password2")]
    pub new_password_confirm: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<()> {
        if self.new_password != self.new_password_confirm {
            return Err(HubError::validation(
                "new_password",
                "Passwords do not match.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_server_profile() {
        let json = r#"{
            "id": 7,
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "Liddell",
            "is_staff": false,
            "is_active": true,
            "date_joined": "2024-01-01T00:00:00Z"
        }"#;

        let user: UserIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, Some(7));
        assert_eq!(user.display_name(), "Alice Liddell");
    }

    #[test]
    fn test_username_only_identity_round_trips_compactly() {
        let user = UserIdentity::from_username("alice");
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"username":"alice","is_staff":false}"#);
        assert_eq!(user.display_name(), "alice");
    }

    #[test]
    fn test_registration_password_mismatch() {
        let registration = Registration {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: "one".to_string(),
            password_confirm: "two".to_string(),
        };

        let err = registration.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_registration_serializes_password2() {
        let registration = Registration {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            first_name: "Bob".to_string(),
            last_name: "Builder".to_string(),
            password: "s3cret!".to_string(),
            password_confirm: "s3cret!".to_string(),
        };

        let value = serde_json::to_value(&registration).unwrap();
        assert_eq!(value["password2"], "s3cret!");
        assert!(value.get("password_confirm").is_none());
    }

    #[test]
    fn test_password_change_validation() {
        let change = PasswordChange {
            old_password: "old".to_string(),
            new_password: "new-one".to_string(),
            new_password_confirm: "new-one".to_string(),
        };
        assert!(change.validate().is_ok());

        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["new_password2"], "new-one");
    }
}

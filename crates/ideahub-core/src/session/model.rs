//! Session domain model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::Lifecycle;
use crate::user::UserIdentity;

/// Access and refresh token as issued by the server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Both tokens are non-blank.
    pub fn is_complete(&self) -> bool {
        !self.access.trim().is_empty() && !self.refresh.trim().is_empty()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Login credentials.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The current authenticated identity of the client.
///
/// `is_authenticated` holds exactly when an access token is present, and
/// `user` is present exactly when `is_authenticated` holds. Use the
/// constructors rather than assembling the fields by hand.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserIdentity>,
    #[serde(skip)]
    pub access_token: Option<String>,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    pub lifecycle: Lifecycle,
}

impl Session {
    /// An unauthenticated session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: UserIdentity, tokens: TokenPair) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            access_token: Some(tokens.access),
            refresh_token: Some(tokens.refresh),
            lifecycle: Lifecycle::Idle,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.lifecycle.last_error()
    }

    pub fn is_pending(&self) -> bool {
        self.lifecycle.is_pending()
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.username.as_str())
    }

    /// Drops identity and tokens, keeping the lifecycle.
    pub(crate) fn reset_identity(&mut self) {
        self.is_authenticated = false;
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("is_authenticated", &self.is_authenticated)
            .field("user", &self.user)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated);
        assert!(session.user.is_none());
        assert!(session.tokens().is_none());
        assert!(session.lifecycle.is_idle());
    }

    #[test]
    fn test_authenticated_session_keeps_tokens() {
        let session = Session::authenticated(
            UserIdentity::from_username("alice"),
            TokenPair::new("a1", "r1"),
        );

        assert!(session.is_authenticated);
        assert_eq!(session.username(), Some("alice"));
        assert_eq!(session.tokens(), Some(TokenPair::new("a1", "r1")));
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let session = Session::authenticated(
            UserIdentity::from_username("alice"),
            TokenPair::new("secret-access", "secret-refresh"),
        );
        let credentials = Credentials::new("alice", "hunter2");

        let rendered = format!("{:?} {:?}", session, credentials);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_serialized_session_omits_tokens() {
        let session = Session::authenticated(
            UserIdentity::from_username("alice"),
            TokenPair::new("a1", "r1"),
        );
        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("a1"));
        assert!(json.contains("\"is_authenticated\":true"));
    }

    #[test]
    fn test_incomplete_token_pair() {
        assert!(TokenPair::new("a", "r").is_complete());
        assert!(!TokenPair::new("a", " ").is_complete());
    }
}

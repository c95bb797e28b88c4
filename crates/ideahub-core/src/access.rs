//! Access Gate: decides whether a view may be entered.
//!
//! Pure and synchronous. The gate only reads the current [`Session`].

use serde::Serialize;

use crate::idea::IdeaId;
use crate::session::Session;

/// Entry point unauthenticated users are sent to.
pub const LOGIN_ROUTE: &str = "/login";

pub const SUBMIT_ROUTE: &str = "/submit";
pub const MY_IDEAS_ROUTE: &str = "/my-ideas";
pub const IDEA_DETAIL_PREFIX: &str = "/ideas/";

/// Route prefixes that require an authenticated session.
pub const PROTECTED_ROUTES: &[&str] = &[SUBMIT_ROUTE, MY_IDEAS_ROUTE, IDEA_DETAIL_PREFIX];

/// Route of the detail view for `id`.
pub fn idea_route(id: IdeaId) -> String {
    format!("{}{}", IDEA_DETAIL_PREFIX, id)
}

/// Returns whether a protected view may be entered with `session`.
pub fn can_enter(session: &Session) -> bool {
    session.is_authenticated
}

/// Outcome of checking a route against the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Admission {
    Admit,
    Redirect { to: String },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// Route-level guard in front of protected views.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn new() -> Self {
        Self
    }

    pub fn is_protected(&self, route: &str) -> bool {
        PROTECTED_ROUTES.iter().any(|protected| {
            if protected.ends_with('/') {
                route.starts_with(protected) && route.len() > protected.len()
            } else {
                route == *protected || route.starts_with(&format!("{}/", protected))
            }
        })
    }

    /// Admits public routes unconditionally and protected routes only with
    /// an authenticated session.
    pub fn check(&self, session: &Session, route: &str) -> Admission {
        if !self.is_protected(route) || can_enter(session) {
            return Admission::Admit;
        }

        tracing::debug!(route, "redirecting unauthenticated visitor");
        Admission::Redirect {
            to: LOGIN_ROUTE.to_string(),
        }
    }
}

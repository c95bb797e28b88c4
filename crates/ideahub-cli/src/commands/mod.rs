pub mod auth;
pub mod campaigns;
pub mod ideas;
mod output;

pub use output::Output;

use anyhow::{anyhow, bail};
use ideahub_core::HubError;
use ideahub_core::access::Admission;

use crate::app::AppBootstrap;

/// Stops a protected command when the Access Gate redirects.
pub fn require_access(app: &AppBootstrap, route: &str) -> anyhow::Result<()> {
    match app.admit(route) {
        Admission::Admit => Ok(()),
        Admission::Redirect { to } => {
            bail!("Please log in first ({} requires a session, redirected to {}). Run `ideahub login <username>`.", route, to)
        }
    }
}

/// Turns a client error into the message shown to the user.
pub fn failure(error: HubError, fallback: &str) -> anyhow::Error {
    if error.is_unauthorized() {
        return anyhow!(
            "Not logged in or session expired. Run `ideahub login <username>`."
        );
    }

    if let Some(fields) = error.as_gateway().and_then(|e| e.field_errors()) {
        let details = fields
            .iter()
            .map(|(field, messages)| format!("  {}: {}", field, messages.join(" ")))
            .collect::<Vec<_>>()
            .join("\n");
        return anyhow!("{}\n{}", error.user_message(fallback), details);
    }

    anyhow!(error.user_message(fallback))
}

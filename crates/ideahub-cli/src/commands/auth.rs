use anyhow::{Result, bail};
use ideahub_core::session::{
    CHANGE_PASSWORD_FALLBACK, LOGIN_FALLBACK, REFRESH_FALLBACK, REGISTER_FALLBACK,
};
use ideahub_core::user::{PasswordChange, Registration};

use super::{Output, failure};
use crate::app::AppBootstrap;

pub async fn login(app: &AppBootstrap, out: Output, username: &str, password: &str) -> Result<()> {
    let session = app
        .session
        .login(username, password)
        .await
        .map_err(failure_for_login)?;

    out.emit(&session, || {
        println!("Logged in as {}", session.username().unwrap_or(username));
    })
}

// A rejected login is a credentials problem, not an expired session.
fn failure_for_login(error: ideahub_core::HubError) -> anyhow::Error {
    if error.is_unauthorized() || error.is_busy() {
        return anyhow::anyhow!(error.user_message(LOGIN_FALLBACK));
    }
    failure(error, LOGIN_FALLBACK)
}

pub fn logout(app: &AppBootstrap, out: Output) -> Result<()> {
    app.session.logout();
    out.message("Logged out")
}

pub async fn whoami(app: &AppBootstrap, out: Output, refresh: bool) -> Result<()> {
    if refresh && app.session.is_authenticated() {
        app.session
            .refresh_profile()
            .await
            .map_err(|e| failure(e, "Failed to load profile"))?;
    }

    let session = app.session.session();
    out.emit(&session, || match &session.user {
        Some(user) => {
            println!("{}", user.display_name());
            println!("  username: {}", user.username);
            if let Some(email) = &user.email {
                println!("  email:    {}", email);
            }
            if let Some(id) = user.id {
                println!("  id:       {}", id);
            }
        }
        None => println!("Not logged in"),
    })
}

pub async fn register(app: &AppBootstrap, out: Output, registration: Registration) -> Result<()> {
    let user = app
        .session
        .register(&registration)
        .await
        .map_err(|e| failure(e, REGISTER_FALLBACK))?;

    out.emit(&user, || {
        println!(
            "Registered {}. Run `ideahub login {}` to sign in.",
            user.username, user.username
        );
    })
}

pub async fn change_password(app: &AppBootstrap, out: Output, change: PasswordChange) -> Result<()> {
    app.session
        .change_password(&change)
        .await
        .map_err(|e| failure(e, CHANGE_PASSWORD_FALLBACK))?;
    out.message("Password changed")
}

/// Exchanges the stored refresh token and installs the new pair.
pub async fn refresh_token(app: &AppBootstrap, out: Output) -> Result<()> {
    let Some(refresh) = app.session.session().refresh_token else {
        bail!("Not logged in. Run `ideahub login <username>`.");
    };

    let tokens = app
        .session
        .refresh(&refresh)
        .await
        .map_err(|e| failure(e, REFRESH_FALLBACK))?;
    app.session.apply_tokens(tokens).map_err(|e| failure(e, REFRESH_FALLBACK))?;

    out.message("Access token refreshed")
}

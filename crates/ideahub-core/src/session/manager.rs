use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use super::model::{Credentials, Session, TokenPair};
use super::storage::{PersistedSession, SessionStorage};
use crate::access;
use crate::error::{GatewayError, HubError, Result};
use crate::gateway::ResourceGateway;
use crate::resource::Lifecycle;
use crate::user::{PasswordChange, Registration, UserIdentity};

pub const LOGIN_FALLBACK: &str = "Login failed";
pub const REGISTER_FALLBACK: &str = "Registration failed";
pub const REFRESH_FALLBACK: &str = "Token refresh failed";
pub const CHANGE_PASSWORD_FALLBACK: &str = "Password change failed";

/// Owns the client [`Session`] and its durable copy.
///
/// `SessionManager` is responsible for:
/// - Restoring the session from the Persistent Session Store at startup
/// - Logging in, logging out and registering
/// - Keeping the durable copy in step with the in-memory session
/// - Resetting the session when the server rejects its credentials
///
/// Observers read the session through [`SessionManager::subscribe`]. Only
/// this type writes it. Components caching per-user data register with
/// [`SessionManager::on_sign_out`] to drop it when the session ends.
pub struct SessionManager {
    gateway: Arc<dyn ResourceGateway>,
    storage: SessionStorage,
    state: watch::Sender<Session>,
    sign_out_listeners: Mutex<Vec<SignOutListener>>,
}

type SignOutListener = Box<dyn Fn() + Send + Sync>;

impl SessionManager {
    /// Creates a manager holding an unauthenticated session.
    ///
    /// Call [`SessionManager::restore`] to pick up a persisted session.
    pub fn new(gateway: Arc<dyn ResourceGateway>, storage: SessionStorage) -> Self {
        let (state, _) = watch::channel(Session::anonymous());
        Self {
            gateway,
            storage,
            state,
            sign_out_listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers `listener` to run after every logout or invalidation.
    ///
    /// Listeners run synchronously on the calling task and must not call
    /// back into this manager.
    pub fn on_sign_out(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.sign_out_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Returns a snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Access Gate decision for the current session.
    pub fn can_enter(&self) -> bool {
        access::can_enter(&self.state.borrow())
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    /// Loads the persisted session without contacting the server.
    ///
    /// Empty or malformed storage leaves the session unauthenticated.
    pub fn restore(&self) -> Session {
        let restored = match self.storage.load() {
            Ok(Some(persisted)) => {
                tracing::debug!(username = %persisted.user.username, "restored persisted session");
                Session::authenticated(persisted.user, persisted.tokens)
            }
            Ok(None) => Session::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable persisted session");
                Session::anonymous()
            }
        };

        self.state.send_replace(restored.clone());
        restored
    }

    /// Authenticates with the server and persists the new session.
    ///
    /// # Errors
    ///
    /// - `Busy` if a login or registration is already pending
    /// - the classified gateway error otherwise; the message is also
    ///   recorded as the session's last error
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let pending = self.begin("login")?;
        let credentials = Credentials::new(username, password);

        match self.gateway.authenticate(&credentials).await {
            Ok(tokens) => {
                let user = UserIdentity::from_username(username);
                self.persist(&PersistedSession {
                    user: user.clone(),
                    tokens: tokens.clone(),
                });
                pending.finish(|session| *session = Session::authenticated(user, tokens));
                tracing::info!(username, "login succeeded");
                Ok(self.session())
            }
            Err(e) => {
                tracing::debug!(username, error = %e, "login failed");
                pending.fail(&e, LOGIN_FALLBACK);
                Err(e.into())
            }
        }
    }

    /// Resets to an unauthenticated session and erases the durable copy.
    ///
    /// Never fails and may be called any number of times.
    pub fn logout(&self) {
        let was_authenticated = self.reset();
        if was_authenticated {
            tracing::info!("logged out");
        }
    }

    /// Forced logout after the server rejected the session's credentials.
    pub fn invalidate(&self, reason: &str) {
        if self.reset() {
            tracing::warn!(reason, "session invalidated");
        }
    }

    /// Exchanges `refresh_token` for a new token pair.
    ///
    /// The session is left as it is. Install the result with
    /// [`SessionManager::apply_tokens`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.gateway.refresh_token(refresh_token).await.map_err(|e| {
            tracing::debug!(error = %e, "token refresh failed");
            HubError::from(e)
        })
    }

    /// Installs a refreshed token pair into the authenticated session.
    pub fn apply_tokens(&self, tokens: TokenPair) -> Result<()> {
        if !self.is_authenticated() {
            return Err(HubError::not_authenticated());
        }

        if let Err(e) = self.storage.save_tokens(&tokens) {
            tracing::error!(error = %e, "failed to persist refreshed tokens");
        }
        self.state.send_modify(|session| {
            session.access_token = Some(tokens.access);
            session.refresh_token = Some(tokens.refresh);
        });
        tracing::debug!("applied refreshed tokens");
        Ok(())
    }

    /// Creates an account. The session stays as it is.
    pub async fn register(&self, registration: &Registration) -> Result<UserIdentity> {
        registration.validate()?;
        let pending = self.begin("register")?;

        match self.gateway.register_user(registration).await {
            Ok(user) => {
                pending.finish(|_| {});
                tracing::info!(username = %user.username, "registered account");
                Ok(user)
            }
            Err(e) => {
                pending.fail(&e, REGISTER_FALLBACK);
                Err(e.into())
            }
        }
    }

    /// Replaces the stored identity with the full server profile.
    pub async fn refresh_profile(&self) -> Result<UserIdentity> {
        let token = self.access_token().ok_or_else(HubError::not_authenticated)?;

        match self.gateway.current_user(&token).await {
            Ok(user) => {
                // Skip if the session changed while the call was in flight.
                let applied = self.state.send_if_modified(|session| {
                    if session.access_token.as_deref() != Some(token.as_str()) {
                        return false;
                    }
                    session.user = Some(user.clone());
                    true
                });
                if applied {
                    if let Err(e) = self.storage.save_user(&user) {
                        tracing::error!(error = %e, "failed to persist user profile");
                    }
                }
                Ok(user)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.invalidate("profile request rejected");
                }
                Err(e.into())
            }
        }
    }

    /// Changes the account password.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<()> {
        change.validate()?;
        let token = self.access_token().ok_or_else(HubError::not_authenticated)?;
        let pending = self.begin("change_password")?;

        match self.gateway.change_password(&token, change).await {
            Ok(()) => {
                pending.finish(|_| {});
                tracing::info!("password changed");
                Ok(())
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.invalidate("password change rejected");
                }
                pending.fail(&e, CHANGE_PASSWORD_FALLBACK);
                Err(e.into())
            }
        }
    }

    /// Marks the session pending, rejecting overlapping auth operations.
    fn begin(&self, operation: &'static str) -> Result<Pending<'_>> {
        let mut busy = false;
        self.state.send_if_modified(|session| {
            if session.lifecycle.is_pending() {
                busy = true;
                return false;
            }
            session.lifecycle = Lifecycle::Pending;
            true
        });

        if busy {
            tracing::debug!(operation, "rejected overlapping session operation");
            return Err(HubError::busy(operation));
        }

        tracing::debug!(operation, "session operation pending");
        Ok(Pending {
            state: &self.state,
            armed: true,
        })
    }

    fn persist(&self, session: &PersistedSession) {
        if let Err(e) = self.storage.save(session) {
            tracing::error!(error = %e, "failed to persist session");
        }
    }

    /// Returns whether the session was authenticated before the reset.
    fn reset(&self) -> bool {
        if let Err(e) = self.storage.clear() {
            tracing::error!(error = %e, "failed to erase persisted session");
        }

        let mut was_authenticated = false;
        self.state.send_if_modified(|session| {
            was_authenticated = session.is_authenticated;
            let changed = session.is_authenticated || !session.lifecycle.is_idle();
            session.reset_identity();
            session.lifecycle = Lifecycle::Idle;
            changed
        });

        let listeners = self
            .sign_out_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
        was_authenticated
    }
}

/// A pending auth operation. Dropping it unsettled returns the session
/// lifecycle to `Idle`.
struct Pending<'a> {
    state: &'a watch::Sender<Session>,
    armed: bool,
}

impl Pending<'_> {
    fn finish(mut self, apply: impl FnOnce(&mut Session)) {
        self.armed = false;
        self.state.send_modify(|session| {
            apply(session);
            session.lifecycle = Lifecycle::Idle;
        });
    }

    fn fail(mut self, error: &GatewayError, fallback: &str) {
        self.armed = false;
        let message = error.server_message().unwrap_or(fallback).to_string();
        self.state
            .send_modify(|session| session.lifecycle = Lifecycle::Error(message));
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_if_modified(|session| {
                if session.lifecycle.is_pending() {
                    session.lifecycle = Lifecycle::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::storage::tests::MapStore;
    use super::super::storage::{ACCESS_TOKEN_KEY, KeyValueStore, REFRESH_TOKEN_KEY, USER_KEY};
    use super::*;
    use crate::campaign::{Campaign, CampaignId};
    use crate::error::GatewayResult;
    use crate::idea::{Contributor, DocumentRef, Idea, IdeaDraft, IdeaId};
    use crate::pagination::{ListFilter, Page};
    use crate::user::UserId;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Auth-only gateway; resource calls are never made by the manager.
    #[derive(Default)]
    struct MockAuthGateway {
        calls: AtomicUsize,
        profile: Mutex<Option<GatewayResult<UserIdentity>>>,
        /// When set, `authenticate` waits until notified.
        gate: Option<Arc<Notify>>,
    }

    impl MockAuthGateway {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn unused<T>() -> GatewayResult<T> {
        Err(GatewayError::unknown(None, "not used by the session manager"))
    }

    #[async_trait]
    impl ResourceGateway for MockAuthGateway {
        async fn authenticate(&self, credentials: &Credentials) -> GatewayResult<TokenPair> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if credentials.password == "correct" {
                Ok(TokenPair::new("access-1", "refresh-1"))
            } else {
                Err(GatewayError::unauthorized(
                    "No active account found with the given credentials",
                ))
            }
        }

        async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<TokenPair> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if refresh_token == "refresh-1" {
                Ok(TokenPair::new("access-2", refresh_token))
            } else {
                Err(GatewayError::unauthorized("Token is invalid or expired"))
            }
        }

        async fn register_user(&self, registration: &Registration) -> GatewayResult<UserIdentity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if registration.username == "taken" {
                return Err(GatewayError::field(
                    "username",
                    "A user with that username already exists.",
                ));
            }
            Ok(UserIdentity::from_username(registration.username.clone()))
        }

        async fn current_user(&self, _token: &str) -> GatewayResult<UserIdentity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profile
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(GatewayError::unauthorized("Token expired")))
        }

        async fn change_password(&self, _token: &str, change: &PasswordChange) -> GatewayResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if change.old_password == "correct" {
                Ok(())
            } else {
                Err(GatewayError::field("old_password", "Old password is incorrect."))
            }
        }

        async fn list_ideas(&self, _: &str, _: &ListFilter) -> GatewayResult<Page<Idea>> {
            unused()
        }

        async fn my_ideas(&self, _: &str, _: &ListFilter) -> GatewayResult<Page<Idea>> {
            unused()
        }

        async fn idea_detail(&self, _: &str, _: IdeaId) -> GatewayResult<Idea> {
            unused()
        }

        async fn create_idea(&self, _: &str, _: &IdeaDraft) -> GatewayResult<Idea> {
            unused()
        }

        async fn update_idea(&self, _: &str, _: IdeaId, _: &IdeaDraft) -> GatewayResult<Idea> {
            unused()
        }

        async fn delete_idea(&self, _: &str, _: IdeaId) -> GatewayResult<()> {
            unused()
        }

        async fn submit_idea(&self, _: &str, _: IdeaId) -> GatewayResult<Option<Idea>> {
            unused()
        }

        async fn add_contributor(&self, _: &str, _: IdeaId, _: UserId) -> GatewayResult<()> {
            unused()
        }

        async fn list_contributors(&self, _: &str, _: IdeaId) -> GatewayResult<Vec<Contributor>> {
            unused()
        }

        async fn list_documents(&self, _: &str, _: IdeaId) -> GatewayResult<Vec<DocumentRef>> {
            unused()
        }

        async fn list_campaigns(&self, _: &str, _: &ListFilter) -> GatewayResult<Page<Campaign>> {
            unused()
        }

        async fn campaign_detail(&self, _: &str, _: CampaignId) -> GatewayResult<Campaign> {
            unused()
        }
    }

    fn setup(gateway: MockAuthGateway) -> (SessionManager, Arc<MockAuthGateway>, Arc<MapStore>) {
        let gateway = Arc::new(gateway);
        let store = Arc::new(MapStore::default());
        let manager = SessionManager::new(gateway.clone(), SessionStorage::new(store.clone()));
        (manager, gateway, store)
    }

    #[tokio::test]
    async fn test_login_persists_three_keys() {
        let (manager, _, store) = setup(MockAuthGateway::default());

        let session = manager.login("alice", "correct").await.unwrap();

        assert!(session.is_authenticated);
        assert_eq!(session.username(), Some("alice"));
        assert!(session.lifecycle.is_idle());

        let entries = store.snapshot();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            assert!(entries.get(key).is_some_and(|v| !v.is_empty()), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_failed_login_leaves_storage_untouched() {
        let (manager, _, store) = setup(MockAuthGateway::default());

        let err = manager.login("alice", "wrong").await.unwrap_err();

        assert!(err.is_unauthorized());
        let session = manager.session();
        assert!(!session.is_authenticated);
        assert_eq!(
            session.last_error(),
            Some("No active account found with the given credentials")
        );
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_failure_without_server_message_uses_fallback() {
        let (manager, _, _) = setup(MockAuthGateway::default());

        let pending = manager.begin("login").unwrap();
        pending.fail(&GatewayError::network("connection refused"), LOGIN_FALLBACK);

        assert_eq!(manager.session().last_error(), Some("Login failed"));
    }

    #[tokio::test]
    async fn test_can_enter_right_after_login() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        assert!(!manager.can_enter());

        manager.login("alice", "correct").await.unwrap();

        assert!(manager.can_enter());
    }

    #[tokio::test]
    async fn test_second_login_while_pending_is_busy() {
        let gate = Arc::new(Notify::new());
        let (manager, gateway, _) = setup(MockAuthGateway {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let manager = Arc::new(manager);

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.login("alice", "correct").await }
        });
        while !manager.session().is_pending() {
            tokio::task::yield_now().await;
        }

        let err = manager.login("alice", "correct").await.unwrap_err();
        assert!(err.is_busy());

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_then_restore_is_anonymous() {
        let (manager, _, store) = setup(MockAuthGateway::default());
        manager.login("alice", "correct").await.unwrap();

        manager.logout();
        let restored = manager.restore();

        assert!(!restored.is_authenticated);
        assert!(restored.user.is_none());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        manager.login("alice", "correct").await.unwrap();

        manager.logout();
        let once = manager.session();
        manager.logout();

        assert_eq!(manager.session(), once);
    }

    #[tokio::test]
    async fn test_sign_out_listeners_run_on_logout_and_invalidate() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        let signed_out = Arc::new(AtomicUsize::new(0));
        manager.on_sign_out({
            let signed_out = signed_out.clone();
            move || {
                signed_out.fetch_add(1, Ordering::SeqCst);
            }
        });

        manager.login("alice", "correct").await.unwrap();
        assert_eq!(signed_out.load(Ordering::SeqCst), 0);

        manager.logout();
        assert_eq!(signed_out.load(Ordering::SeqCst), 1);

        manager.login("alice", "correct").await.unwrap();
        manager.invalidate("token rejected");
        assert_eq!(signed_out.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_restore_reads_persisted_session_without_network() {
        let (manager, gateway, store) = setup(MockAuthGateway::default());
        store
            .set_many(&[
                (ACCESS_TOKEN_KEY, "access-1".to_string()),
                (REFRESH_TOKEN_KEY, "refresh-1".to_string()),
                (USER_KEY, r#"{"username":"alice"}"#.to_string()),
            ])
            .unwrap();

        let session = manager.restore();

        assert!(session.is_authenticated);
        assert_eq!(session.username(), Some("alice"));
        assert_eq!(manager.access_token().as_deref(), Some("access-1"));
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn test_restore_ignores_malformed_storage() {
        let (manager, _, store) = setup(MockAuthGateway::default());
        store
            .set_many(&[
                (ACCESS_TOKEN_KEY, "access-1".to_string()),
                (REFRESH_TOKEN_KEY, "refresh-1".to_string()),
                (USER_KEY, "not json".to_string()),
            ])
            .unwrap();

        assert!(!manager.restore().is_authenticated);
    }

    #[tokio::test]
    async fn test_refresh_does_not_touch_session() {
        let (manager, _, store) = setup(MockAuthGateway::default());
        manager.login("alice", "correct").await.unwrap();

        let tokens = manager.refresh("refresh-1").await.unwrap();

        assert_eq!(tokens, TokenPair::new("access-2", "refresh-1"));
        assert_eq!(manager.access_token().as_deref(), Some("access-1"));

        manager.apply_tokens(tokens).unwrap();
        assert_eq!(manager.access_token().as_deref(), Some("access-2"));
        assert_eq!(
            store.snapshot().get(ACCESS_TOKEN_KEY).map(String::as_str),
            Some("access-2")
        );
    }

    #[test]
    fn test_apply_tokens_requires_session() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        let err = manager
            .apply_tokens(TokenPair::new("a", "r"))
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_register_does_not_log_in() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        let registration = Registration {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            first_name: "Bob".to_string(),
            last_name: "Builder".to_string(),
            password: "pw".to_string(),
            password_confirm: "pw".to_string(),
        };

        let user = manager.register(&registration).await.unwrap();

        assert_eq!(user.username, "bob");
        assert!(!manager.is_authenticated());
        assert!(manager.session().lifecycle.is_idle());
    }

    #[tokio::test]
    async fn test_register_rejection_records_field_message() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        let registration = Registration {
            username: "taken".to_string(),
            email: "x@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: "pw".to_string(),
            password_confirm: "pw".to_string(),
        };

        let err = manager.register(&registration).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(
            manager.session().last_error(),
            Some("A user with that username already exists.")
        );
    }

    #[tokio::test]
    async fn test_refresh_profile_updates_user() {
        let profile = UserIdentity {
            id: Some(7),
            email: Some("alice@example.com".to_string()),
            ..UserIdentity::from_username("alice")
        };
        let (manager, _, store) = setup(MockAuthGateway {
            profile: Mutex::new(Some(Ok(profile.clone()))),
            ..Default::default()
        });
        manager.login("alice", "correct").await.unwrap();

        manager.refresh_profile().await.unwrap();

        assert_eq!(manager.session().user, Some(profile));
        assert!(store.snapshot()[USER_KEY].contains("alice@example.com"));
    }

    #[tokio::test]
    async fn test_rejected_profile_request_invalidates_session() {
        let (manager, _, store) = setup(MockAuthGateway::default());
        manager.login("alice", "correct").await.unwrap();

        let err = manager.refresh_profile().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!manager.is_authenticated());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_change_password_mismatch_is_local() {
        let (manager, gateway, _) = setup(MockAuthGateway::default());
        manager.login("alice", "correct").await.unwrap();
        let calls = gateway.calls();

        let err = manager
            .change_password(&PasswordChange {
                old_password: "correct".to_string(),
                new_password: "a".to_string(),
                new_password_confirm: "b".to_string(),
            })
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(gateway.calls(), calls);
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let (manager, gateway, _) = setup(MockAuthGateway::default());

        let err = manager
            .change_password(&PasswordChange {
                old_password: "correct".to_string(),
                new_password: "n".to_string(),
                new_password_confirm: "n".to_string(),
            })
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let (manager, _, _) = setup(MockAuthGateway::default());
        let mut rx = manager.subscribe();

        manager.login("alice", "correct").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated);

        manager.logout();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated);
    }
}

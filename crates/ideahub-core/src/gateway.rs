//! Resource Gateway trait.
//!
//! Defines the transport-facing contract used by the Session Manager and
//! the Resource Store. Implementations translate a logical operation into
//! a server call and classify every failure as a [`GatewayError`].

use async_trait::async_trait;

use crate::campaign::{Campaign, CampaignId};
use crate::error::GatewayResult;
use crate::idea::{Contributor, DocumentRef, Idea, IdeaDraft, IdeaId};
use crate::pagination::{ListFilter, Page};
use crate::session::{Credentials, TokenPair};
use crate::user::{PasswordChange, Registration, UserId, UserIdentity};

/// Stateless access to the IdeaHub server.
///
/// Authenticated operations take the access token explicitly. The gateway
/// never owns or caches a session, and it never retries.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Attach `token` as a bearer credential on authenticated calls
/// - Decode list envelopes and bare arrays into [`Page`]
/// - Map transport failures to `Network` and unclassified responses to `Unknown`
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// Exchanges credentials for a token pair.
    async fn authenticate(&self, credentials: &Credentials) -> GatewayResult<TokenPair>;

    /// Exchanges a refresh token for a new pair.
    ///
    /// When the server does not rotate the refresh token, the returned pair
    /// carries the one that was sent.
    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<TokenPair>;

    /// Creates an account. Does not authenticate.
    async fn register_user(&self, registration: &Registration) -> GatewayResult<UserIdentity>;

    async fn current_user(&self, token: &str) -> GatewayResult<UserIdentity>;

    async fn change_password(&self, token: &str, change: &PasswordChange) -> GatewayResult<()>;

    /// Lists ideas visible to the caller, filtered and paginated.
    async fn list_ideas(&self, token: &str, filter: &ListFilter) -> GatewayResult<Page<Idea>>;

    /// Lists ideas the caller submitted or contributes to.
    async fn my_ideas(&self, token: &str, filter: &ListFilter) -> GatewayResult<Page<Idea>>;

    async fn idea_detail(&self, token: &str, id: IdeaId) -> GatewayResult<Idea>;

    async fn create_idea(&self, token: &str, draft: &IdeaDraft) -> GatewayResult<Idea>;

    async fn update_idea(&self, token: &str, id: IdeaId, draft: &IdeaDraft)
    -> GatewayResult<Idea>;

    async fn delete_idea(&self, token: &str, id: IdeaId) -> GatewayResult<()>;

    /// Moves a draft idea to `SUBMITTED`.
    ///
    /// Returns the updated idea when the server sends one back. Servers
    /// that acknowledge with an empty object yield `None`.
    async fn submit_idea(&self, token: &str, id: IdeaId) -> GatewayResult<Option<Idea>>;

    async fn add_contributor(&self, token: &str, idea: IdeaId, user: UserId)
    -> GatewayResult<()>;

    async fn list_contributors(&self, token: &str, idea: IdeaId)
    -> GatewayResult<Vec<Contributor>>;

    async fn list_documents(&self, token: &str, idea: IdeaId) -> GatewayResult<Vec<DocumentRef>>;

    async fn list_campaigns(&self, token: &str, filter: &ListFilter)
    -> GatewayResult<Page<Campaign>>;

    async fn campaign_detail(&self, token: &str, id: CampaignId) -> GatewayResult<Campaign>;
}

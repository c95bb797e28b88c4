//! Resource Store: client-side cache of server resources.
//!
//! Holds one sequenced collection or detail per resource type and keeps
//! them in step with the server through the Resource Gateway. Every state
//! is published through a `watch` channel; the store is its only writer.

use std::sync::{Arc, Weak};

use tokio::sync::watch;

use ideahub_core::campaign::{Campaign, CampaignId};
use ideahub_core::error::{GatewayError, GatewayResult, HubError, Result};
use ideahub_core::gateway::ResourceGateway;
use ideahub_core::idea::{Contributor, DocumentRef, Idea, IdeaDraft, IdeaId, IdeaStatus};
use ideahub_core::pagination::{ListFilter, Page};
use ideahub_core::resource::{
    Generation, RequestSeq, ResourceCollection, ResourceDetail, Settlement,
};
use ideahub_core::session::SessionManager;
use ideahub_core::user::UserId;

use crate::mutation_guard::MutationGuard;

pub const FETCH_IDEAS_FALLBACK: &str = "Failed to fetch ideas";
pub const FETCH_IDEA_FALLBACK: &str = "Failed to fetch idea";
pub const FETCH_CAMPAIGNS_FALLBACK: &str = "Failed to fetch campaigns";
pub const FETCH_CAMPAIGN_FALLBACK: &str = "Failed to fetch campaign";
pub const FETCH_CONTRIBUTORS_FALLBACK: &str = "Failed to fetch contributors";
pub const FETCH_DOCUMENTS_FALLBACK: &str = "Failed to fetch documents";
pub const CREATE_IDEA_FALLBACK: &str = "Failed to create idea";

/// Cached server resources for the signed-in user.
///
/// # Ordering
///
/// Each collection and detail numbers its requests. A result is applied
/// only if no newer result has been applied, and only the newest request
/// moves the lifecycle out of `Pending`, whatever order responses arrive in.
///
/// # Mutations
///
/// Mutations are guarded per key: a second `submit` of the same idea
/// while the first is outstanding fails with `Busy`. Fetches are never
/// rejected; a newer fetch supersedes an older one.
///
/// # Sign-out
///
/// Everything cached is dropped when the session ends, through logout or
/// because the server rejected the credentials. Responses still in flight
/// at that point are discarded.
pub struct ResourceStore {
    gateway: Arc<dyn ResourceGateway>,
    session: Arc<SessionManager>,
    ideas: watch::Sender<ResourceCollection<Idea>>,
    my_ideas: watch::Sender<ResourceCollection<Idea>>,
    campaigns: watch::Sender<ResourceCollection<Campaign>>,
    idea: watch::Sender<ResourceDetail<Idea>>,
    campaign: watch::Sender<ResourceDetail<Campaign>>,
    contributors: watch::Sender<ResourceDetail<Vec<Contributor>>>,
    documents: watch::Sender<ResourceDetail<Vec<DocumentRef>>>,
    mutations: MutationGuard,
}

impl ResourceStore {
    /// Creates the store and registers it to be cleared on sign-out.
    pub fn new(gateway: Arc<dyn ResourceGateway>, session: Arc<SessionManager>) -> Arc<Self> {
        let store = Arc::new(Self {
            gateway,
            session: session.clone(),
            ideas: watch::channel(ResourceCollection::new()).0,
            my_ideas: watch::channel(ResourceCollection::new()).0,
            campaigns: watch::channel(ResourceCollection::new()).0,
            idea: watch::channel(ResourceDetail::new()).0,
            campaign: watch::channel(ResourceDetail::new()).0,
            contributors: watch::channel(ResourceDetail::new()).0,
            documents: watch::channel(ResourceDetail::new()).0,
            mutations: MutationGuard::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&store);
        session.on_sign_out(move || {
            if let Some(store) = weak.upgrade() {
                store.reset();
            }
        });
        store
    }

    /// Drops every cached collection and detail.
    ///
    /// Fetches and creates still in flight settle into nothing.
    pub fn reset(&self) {
        self.ideas.send_modify(ResourceCollection::clear);
        self.my_ideas.send_modify(ResourceCollection::clear);
        self.campaigns.send_modify(ResourceCollection::clear);
        self.idea.send_modify(ResourceDetail::clear);
        self.campaign.send_modify(ResourceDetail::clear);
        self.contributors.send_modify(ResourceDetail::clear);
        self.documents.send_modify(ResourceDetail::clear);
        tracing::debug!("resource cache cleared");
    }

    // ============================================================================
    // Snapshots and subscriptions
    // ============================================================================

    pub fn ideas(&self) -> ResourceCollection<Idea> {
        self.ideas.borrow().clone()
    }

    pub fn my_ideas(&self) -> ResourceCollection<Idea> {
        self.my_ideas.borrow().clone()
    }

    pub fn campaigns(&self) -> ResourceCollection<Campaign> {
        self.campaigns.borrow().clone()
    }

    pub fn idea(&self) -> ResourceDetail<Idea> {
        self.idea.borrow().clone()
    }

    pub fn campaign(&self) -> ResourceDetail<Campaign> {
        self.campaign.borrow().clone()
    }

    pub fn contributors(&self) -> ResourceDetail<Vec<Contributor>> {
        self.contributors.borrow().clone()
    }

    pub fn documents(&self) -> ResourceDetail<Vec<DocumentRef>> {
        self.documents.borrow().clone()
    }

    pub fn subscribe_ideas(&self) -> watch::Receiver<ResourceCollection<Idea>> {
        self.ideas.subscribe()
    }

    pub fn subscribe_my_ideas(&self) -> watch::Receiver<ResourceCollection<Idea>> {
        self.my_ideas.subscribe()
    }

    pub fn subscribe_campaigns(&self) -> watch::Receiver<ResourceCollection<Campaign>> {
        self.campaigns.subscribe()
    }

    pub fn subscribe_idea(&self) -> watch::Receiver<ResourceDetail<Idea>> {
        self.idea.subscribe()
    }

    pub fn subscribe_campaign(&self) -> watch::Receiver<ResourceDetail<Campaign>> {
        self.campaign.subscribe()
    }

    pub fn subscribe_contributors(&self) -> watch::Receiver<ResourceDetail<Vec<Contributor>>> {
        self.contributors.subscribe()
    }

    pub fn subscribe_documents(&self) -> watch::Receiver<ResourceDetail<Vec<DocumentRef>>> {
        self.documents.subscribe()
    }

    // ============================================================================
    // Fetches
    // ============================================================================

    /// Fetches a page of ideas into the `ideas` collection.
    pub async fn fetch_list(&self, filter: &ListFilter) -> Result<Page<Idea>> {
        let token = self.token()?;
        let seq = begin_collection(&self.ideas, "fetch_list");
        let outcome = self.gateway.list_ideas(&token, filter).await;
        self.settle_collection(&self.ideas, "fetch_list", seq, outcome, FETCH_IDEAS_FALLBACK)
    }

    /// Fetches the caller's own ideas into the `my_ideas` collection.
    pub async fn fetch_my_ideas(&self, filter: &ListFilter) -> Result<Page<Idea>> {
        let token = self.token()?;
        let seq = begin_collection(&self.my_ideas, "fetch_my_ideas");
        let outcome = self.gateway.my_ideas(&token, filter).await;
        self.settle_collection(
            &self.my_ideas,
            "fetch_my_ideas",
            seq,
            outcome,
            FETCH_IDEAS_FALLBACK,
        )
    }

    pub async fn fetch_campaigns(&self, filter: &ListFilter) -> Result<Page<Campaign>> {
        let token = self.token()?;
        let seq = begin_collection(&self.campaigns, "fetch_campaigns");
        let outcome = self.gateway.list_campaigns(&token, filter).await;
        self.settle_collection(
            &self.campaigns,
            "fetch_campaigns",
            seq,
            outcome,
            FETCH_CAMPAIGNS_FALLBACK,
        )
    }

    /// Loads one idea into the detail focus.
    pub async fn fetch_detail(&self, id: IdeaId) -> Result<Idea> {
        let token = self.token()?;
        let seq = begin_detail(&self.idea, "fetch_detail");
        let outcome = self.gateway.idea_detail(&token, id).await;
        self.settle_detail(&self.idea, "fetch_detail", seq, outcome, FETCH_IDEA_FALLBACK)
    }

    pub async fn fetch_campaign(&self, id: CampaignId) -> Result<Campaign> {
        let token = self.token()?;
        let seq = begin_detail(&self.campaign, "fetch_campaign");
        let outcome = self.gateway.campaign_detail(&token, id).await;
        self.settle_detail(
            &self.campaign,
            "fetch_campaign",
            seq,
            outcome,
            FETCH_CAMPAIGN_FALLBACK,
        )
    }

    pub async fn fetch_contributors(&self, idea: IdeaId) -> Result<Vec<Contributor>> {
        let token = self.token()?;
        let seq = begin_detail(&self.contributors, "fetch_contributors");
        let outcome = self.gateway.list_contributors(&token, idea).await;
        self.settle_detail(
            &self.contributors,
            "fetch_contributors",
            seq,
            outcome,
            FETCH_CONTRIBUTORS_FALLBACK,
        )
    }

    pub async fn fetch_documents(&self, idea: IdeaId) -> Result<Vec<DocumentRef>> {
        let token = self.token()?;
        let seq = begin_detail(&self.documents, "fetch_documents");
        let outcome = self.gateway.list_documents(&token, idea).await;
        self.settle_detail(
            &self.documents,
            "fetch_documents",
            seq,
            outcome,
            FETCH_DOCUMENTS_FALLBACK,
        )
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    /// Creates an idea and prepends the server's copy to `ideas`.
    ///
    /// The draft is trimmed and checked locally first; an invalid draft
    /// fails with a validation error and never reaches the server. A create
    /// does not supersede fetches issued before it.
    pub async fn create(&self, draft: &IdeaDraft) -> Result<Idea> {
        let token = self.token()?;
        let draft = draft.normalized()?;
        let _ticket = self.mutations.acquire("create")?;
        let generation = begin_create(&self.ideas);

        match self.gateway.create_idea(&token, &draft).await {
            Ok(idea) => {
                let id = idea.id;
                let mut settlement = Settlement::Discarded;
                self.ideas.send_if_modified(|ideas| {
                    settlement =
                        ideas.settle_created(generation, idea.clone(), |existing| existing.id == id);
                    settlement.is_applied()
                });
                tracing::debug!(operation = "create", idea = %id, ?settlement, "idea created");
                Ok(idea)
            }
            Err(e) => {
                self.on_gateway_error("create", &e);
                let message = e.server_message().unwrap_or(CREATE_IDEA_FALLBACK).to_string();
                self.ideas.send_if_modified(|ideas| {
                    ideas.settle_create_failed(generation, message).is_applied()
                });
                Err(e.into())
            }
        }
    }

    /// Replaces an idea and every cached copy of it.
    pub async fn update(&self, id: IdeaId, draft: &IdeaDraft) -> Result<Idea> {
        let token = self.token()?;
        let draft = draft.normalized()?;
        let _ticket = self.mutations.acquire(format!("update:{}", id))?;

        let idea = self
            .gateway
            .update_idea(&token, id, &draft)
            .await
            .map_err(|e| self.mutation_failed("update", e))?;

        self.amend_cached(id, |cached| *cached = idea.clone());
        Ok(idea)
    }

    /// Deletes an idea and drops it from every cache.
    pub async fn delete(&self, id: IdeaId) -> Result<()> {
        let token = self.token()?;
        let _ticket = self.mutations.acquire(format!("delete:{}", id))?;

        self.gateway
            .delete_idea(&token, id)
            .await
            .map_err(|e| self.mutation_failed("delete", e))?;

        for collection in [&self.ideas, &self.my_ideas] {
            collection.send_if_modified(|ideas| ideas.remove_where(|idea| idea.id == id) > 0);
        }
        self.idea
            .send_if_modified(|detail| detail.clear_if(|idea| idea.id == id));
        Ok(())
    }

    /// Submits a draft idea. Cached copies get the new status in place.
    ///
    /// When the server only acknowledges the submit, cached copies are
    /// marked `SUBMITTED` and the idea is returned from the cache, or
    /// loaded from the server if it was not cached.
    pub async fn submit(&self, id: IdeaId) -> Result<Idea> {
        let token = self.token()?;
        let _ticket = self.mutations.acquire(format!("submit:{}", id))?;

        let acknowledged = self
            .gateway
            .submit_idea(&token, id)
            .await
            .map_err(|e| self.mutation_failed("submit", e))?;

        if let Some(submitted) = acknowledged {
            self.amend_cached(id, |cached| {
                cached.status = submitted.status;
                cached.submitted_at = submitted.submitted_at;
                cached.updated_at = submitted.updated_at;
            });
            return Ok(submitted);
        }

        self.amend_cached(id, |cached| cached.status = IdeaStatus::Submitted);
        if let Some(cached) = self.cached(id) {
            return Ok(cached);
        }

        tracing::debug!(operation = "submit", idea = %id, "reloading acknowledged idea");
        self.gateway
            .idea_detail(&token, id)
            .await
            .map_err(|e| self.mutation_failed("submit", e))
    }

    /// Adds a contributor. The cache is left alone; re-fetch to see it.
    pub async fn add_contributor(&self, idea: IdeaId, user: UserId) -> Result<()> {
        let token = self.token()?;
        let _ticket = self
            .mutations
            .acquire(format!("add_contributor:{}:{}", idea, user))?;

        self.gateway
            .add_contributor(&token, idea, user)
            .await
            .map_err(|e| self.mutation_failed("add_contributor", e))
    }

    // ============================================================================
    // Internals
    // ============================================================================

    fn token(&self) -> Result<String> {
        self.session
            .access_token()
            .ok_or_else(HubError::not_authenticated)
    }

    fn on_gateway_error(&self, operation: &str, error: &GatewayError) {
        if error.is_unauthorized() {
            self.session
                .invalidate(&format!("{} rejected by server", operation));
        }
    }

    fn mutation_failed(&self, operation: &'static str, error: GatewayError) -> HubError {
        tracing::debug!(operation, error = %error, "mutation failed");
        self.on_gateway_error(operation, &error);
        error.into()
    }

    /// Applies `amend` to every cached copy of idea `id`.
    fn amend_cached<F>(&self, id: IdeaId, amend: F)
    where
        F: Fn(&mut Idea),
    {
        for collection in [&self.ideas, &self.my_ideas] {
            collection.send_if_modified(|ideas| ideas.update_where(|idea| idea.id == id, &amend) > 0);
        }
        self.idea
            .send_if_modified(|detail| detail.update_if(|idea| idea.id == id, &amend));
    }

    /// The first cached copy of idea `id`, detail focus first.
    fn cached(&self, id: IdeaId) -> Option<Idea> {
        if let Some(idea) = self.idea.borrow().current().filter(|idea| idea.id == id) {
            return Some(idea.clone());
        }
        [&self.ideas, &self.my_ideas].into_iter().find_map(|collection| {
            collection
                .borrow()
                .items()
                .iter()
                .find(|idea| idea.id == id)
                .cloned()
        })
    }

    fn settle_collection<T: Clone>(
        &self,
        target: &watch::Sender<ResourceCollection<T>>,
        operation: &'static str,
        seq: RequestSeq,
        outcome: GatewayResult<Page<T>>,
        fallback: &str,
    ) -> Result<Page<T>> {
        match outcome {
            Ok(page) => {
                let mut settlement = Settlement::Discarded;
                target.send_if_modified(|collection| {
                    settlement = collection.settle(seq, Ok(page.clone()));
                    settlement.is_applied()
                });
                log_settlement(operation, seq, settlement);
                Ok(page)
            }
            Err(e) => {
                self.on_gateway_error(operation, &e);
                let message = e.server_message().unwrap_or(fallback).to_string();
                let mut settlement = Settlement::Discarded;
                target.send_if_modified(|collection| {
                    settlement = collection.settle(seq, Err(message));
                    settlement.is_applied()
                });
                log_settlement(operation, seq, settlement);
                Err(e.into())
            }
        }
    }

    fn settle_detail<T: Clone>(
        &self,
        target: &watch::Sender<ResourceDetail<T>>,
        operation: &'static str,
        seq: RequestSeq,
        outcome: GatewayResult<T>,
        fallback: &str,
    ) -> Result<T> {
        match outcome {
            Ok(value) => {
                let mut settlement = Settlement::Discarded;
                target.send_if_modified(|detail| {
                    settlement = detail.settle(seq, Ok(value.clone()));
                    settlement.is_applied()
                });
                log_settlement(operation, seq, settlement);
                Ok(value)
            }
            Err(e) => {
                self.on_gateway_error(operation, &e);
                let message = e.server_message().unwrap_or(fallback).to_string();
                let mut settlement = Settlement::Discarded;
                target.send_if_modified(|detail| {
                    settlement = detail.settle(seq, Err(message));
                    settlement.is_applied()
                });
                log_settlement(operation, seq, settlement);
                Err(e.into())
            }
        }
    }
}

fn begin_collection<T>(target: &watch::Sender<ResourceCollection<T>>, operation: &str) -> RequestSeq {
    let mut seq = RequestSeq::default();
    target.send_modify(|collection| seq = collection.begin());
    tracing::debug!(operation, %seq, "request pending");
    seq
}

fn begin_create<T>(target: &watch::Sender<ResourceCollection<T>>) -> Generation {
    let mut generation = Generation::default();
    target.send_modify(|collection| generation = collection.begin_create());
    tracing::debug!(operation = "create", "request pending");
    generation
}

fn begin_detail<T>(target: &watch::Sender<ResourceDetail<T>>, operation: &str) -> RequestSeq {
    let mut seq = RequestSeq::default();
    target.send_modify(|detail| seq = detail.begin());
    tracing::debug!(operation, %seq, "request pending");
    seq
}

fn log_settlement(operation: &str, seq: RequestSeq, settlement: Settlement) {
    match settlement {
        Settlement::Applied => tracing::debug!(operation, %seq, "request settled"),
        Settlement::Discarded => tracing::warn!(operation, %seq, "discarded stale response"),
    }
}

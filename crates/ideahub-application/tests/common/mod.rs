//! Shared fixtures for Resource Store tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use ideahub_application::ResourceStore;
use ideahub_core::campaign::{Campaign, CampaignId, CampaignStatus};
use ideahub_core::error::{GatewayError, GatewayResult};
use ideahub_core::gateway::ResourceGateway;
use ideahub_core::idea::{Contributor, DocumentRef, ExpectedImpact, Idea, IdeaDraft, IdeaId, IdeaStatus};
use ideahub_core::pagination::{ListFilter, Page};
use ideahub_core::session::{
    ACCESS_TOKEN_KEY, Credentials, KeyValueStore, REFRESH_TOKEN_KEY, SessionManager,
    SessionStorage, TokenPair, USER_KEY,
};
use ideahub_core::user::{PasswordChange, Registration, UserId, UserIdentity};
use ideahub_infrastructure::MemoryStore;

/// Queue of replies for one gateway operation.
///
/// Each call takes the next reply. A reply pushed with [`Script::defer`]
/// completes only when the test sends through the returned sender, which
/// lets a test choose the order in which calls finish.
pub struct Script<T> {
    replies: Mutex<VecDeque<oneshot::Receiver<GatewayResult<T>>>>,
    calls: Mutex<usize>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }
}

impl<T> Script<T> {
    pub fn reply(&self, result: GatewayResult<T>) {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        self.replies.lock().unwrap().push_back(rx);
    }

    pub fn defer(&self) -> oneshot::Sender<GatewayResult<T>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(rx);
        tx
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    async fn next(&self) -> GatewayResult<T> {
        *self.calls.lock().unwrap() += 1;
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(GatewayError::network("reply dropped"))),
            None => Err(GatewayError::unknown(None, "no scripted reply")),
        }
    }
}

/// A Resource Gateway driven entirely by test scripts.
#[derive(Default)]
pub struct ScriptedGateway {
    pub list_ideas: Script<Page<Idea>>,
    pub my_ideas: Script<Page<Idea>>,
    pub idea_detail: Script<Idea>,
    pub create_idea: Script<Idea>,
    pub update_idea: Script<Idea>,
    pub delete_idea: Script<()>,
    pub submit_idea: Script<Option<Idea>>,
    pub add_contributor: Script<()>,
    pub list_contributors: Script<Vec<Contributor>>,
    pub list_documents: Script<Vec<DocumentRef>>,
    pub list_campaigns: Script<Page<Campaign>>,
    pub campaign_detail: Script<Campaign>,
    /// Filters passed to `list_ideas`, in call order.
    pub list_filters: Mutex<Vec<ListFilter>>,
}

impl ScriptedGateway {
    pub fn total_calls(&self) -> usize {
        self.list_ideas.calls()
            + self.my_ideas.calls()
            + self.idea_detail.calls()
            + self.create_idea.calls()
            + self.update_idea.calls()
            + self.delete_idea.calls()
            + self.submit_idea.calls()
            + self.add_contributor.calls()
            + self.list_contributors.calls()
            + self.list_documents.calls()
            + self.list_campaigns.calls()
            + self.campaign_detail.calls()
    }
}

#[async_trait]
impl ResourceGateway for ScriptedGateway {
    async fn authenticate(&self, _: &Credentials) -> GatewayResult<TokenPair> {
        Ok(TokenPair::new("access-1", "refresh-1"))
    }

    async fn refresh_token(&self, refresh_token: &str) -> GatewayResult<TokenPair> {
        Ok(TokenPair::new("access-2", refresh_token))
    }

    async fn register_user(&self, registration: &Registration) -> GatewayResult<UserIdentity> {
        Ok(UserIdentity::from_username(registration.username.clone()))
    }

    async fn current_user(&self, _: &str) -> GatewayResult<UserIdentity> {
        Ok(UserIdentity::from_username("alice"))
    }

    async fn change_password(&self, _: &str, _: &PasswordChange) -> GatewayResult<()> {
        Ok(())
    }

    async fn list_ideas(&self, _: &str, filter: &ListFilter) -> GatewayResult<Page<Idea>> {
        self.list_filters.lock().unwrap().push(filter.clone());
        self.list_ideas.next().await
    }

    async fn my_ideas(&self, _: &str, _: &ListFilter) -> GatewayResult<Page<Idea>> {
        self.my_ideas.next().await
    }

    async fn idea_detail(&self, _: &str, _: IdeaId) -> GatewayResult<Idea> {
        self.idea_detail.next().await
    }

    async fn create_idea(&self, _: &str, _: &IdeaDraft) -> GatewayResult<Idea> {
        self.create_idea.next().await
    }

    async fn update_idea(&self, _: &str, _: IdeaId, _: &IdeaDraft) -> GatewayResult<Idea> {
        self.update_idea.next().await
    }

    async fn delete_idea(&self, _: &str, _: IdeaId) -> GatewayResult<()> {
        self.delete_idea.next().await
    }

    async fn submit_idea(&self, _: &str, _: IdeaId) -> GatewayResult<Option<Idea>> {
        self.submit_idea.next().await
    }

    async fn add_contributor(&self, _: &str, _: IdeaId, _: UserId) -> GatewayResult<()> {
        self.add_contributor.next().await
    }

    async fn list_contributors(&self, _: &str, _: IdeaId) -> GatewayResult<Vec<Contributor>> {
        self.list_contributors.next().await
    }

    async fn list_documents(&self, _: &str, _: IdeaId) -> GatewayResult<Vec<DocumentRef>> {
        self.list_documents.next().await
    }

    async fn list_campaigns(&self, _: &str, _: &ListFilter) -> GatewayResult<Page<Campaign>> {
        self.list_campaigns.next().await
    }

    async fn campaign_detail(&self, _: &str, _: CampaignId) -> GatewayResult<Campaign> {
        self.campaign_detail.next().await
    }
}

pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub session: Arc<SessionManager>,
    pub store: Arc<ResourceStore>,
    pub storage: Arc<MemoryStore>,
}

/// Builds a store whose session was restored from storage.
pub fn signed_in() -> Harness {
    let storage = Arc::new(MemoryStore::new());
    storage
        .set_many(&[
            (ACCESS_TOKEN_KEY, "access-1".to_string()),
            (REFRESH_TOKEN_KEY, "refresh-1".to_string()),
            (USER_KEY, r#"{"id": 1, "username": "alice"}"#.to_string()),
        ])
        .unwrap();
    build(storage)
}

pub fn signed_out() -> Harness {
    build(Arc::new(MemoryStore::new()))
}

fn build(storage: Arc<MemoryStore>) -> Harness {
    let gateway = Arc::new(ScriptedGateway::default());
    let session = Arc::new(SessionManager::new(
        gateway.clone(),
        SessionStorage::new(storage.clone()),
    ));
    session.restore();
    let store = ResourceStore::new(gateway.clone(), session.clone());
    Harness {
        gateway,
        session,
        store,
        storage,
    }
}

pub fn idea(title: &str, status: IdeaStatus) -> Idea {
    Idea {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        expected_impact: ExpectedImpact::Medium,
        status,
        submitter: None,
        campaign: None,
        contributors: Vec::new(),
        documents: Vec::new(),
        contributor_count: None,
        document_count: None,
        created_at: None,
        updated_at: None,
        submitted_at: None,
        recognized_at: None,
    }
}

pub fn ideas(prefix: &str, count: usize) -> Vec<Idea> {
    (0..count)
        .map(|i| idea(&format!("{} {}", prefix, i + 1), IdeaStatus::Submitted))
        .collect()
}

pub fn page<T>(items: Vec<T>, total: u64, page: u32, has_next: bool) -> Page<T> {
    Page {
        items,
        total_count: total,
        next: has_next.then(|| format!("http://localhost:8000/api/v1/ideas/?page={}", page + 1)),
        previous: (page > 1).then(|| format!("http://localhost:8000/api/v1/ideas/?page={}", page - 1)),
        page,
    }
}

pub fn campaign(name: &str) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        status: CampaignStatus::Active,
        start_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        end_date: chrono::NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        created_at: None,
        updated_at: None,
    }
}

pub fn draft(title: &str) -> IdeaDraft {
    IdeaDraft {
        title: title.to_string(),
        description: "Reduce onboarding time with a checklist".to_string(),
        expected_impact: ExpectedImpact::High,
        campaign_id: Uuid::new_v4(),
    }
}

/// Yields until `condition` holds, so spawned calls reach the gateway.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub fn idea_with_status(idea: &Idea, status: IdeaStatus) -> Idea {
    Idea {
        status,
        ..idea.clone()
    }
}

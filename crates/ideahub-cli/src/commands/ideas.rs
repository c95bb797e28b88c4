use anyhow::{Result, bail};
use ideahub_application::resource_store::{
    FETCH_CONTRIBUTORS_FALLBACK, FETCH_DOCUMENTS_FALLBACK, FETCH_IDEA_FALLBACK, FETCH_IDEAS_FALLBACK,
};
use ideahub_core::access::{MY_IDEAS_ROUTE, SUBMIT_ROUTE, idea_route};
use ideahub_core::campaign::CampaignId;
use ideahub_core::idea::{ExpectedImpact, Idea, IdeaDraft, IdeaId, IdeaStatus};
use ideahub_core::pagination::{ListFilter, Pagination};
use ideahub_core::user::UserId;

use super::{Output, failure, require_access};
use crate::app::AppBootstrap;

/// Filters accepted by `ideas list`.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub status: Option<IdeaStatus>,
    pub impact: Option<ExpectedImpact>,
    pub campaign: Option<CampaignId>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub mine: bool,
}

impl ListArgs {
    pub fn filter(&self) -> ListFilter {
        let mut filter = ListFilter::new();
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        if let Some(impact) = self.impact {
            filter = filter.with_expected_impact(impact);
        }
        if let Some(campaign) = self.campaign {
            filter = filter.with_campaign(campaign);
        }
        if let Some(search) = &self.search {
            filter = filter.with_search(search.clone());
        }
        if let Some(ordering) = &self.ordering {
            filter = filter.with_ordering(ordering.clone());
        }
        if let Some(page) = self.page {
            filter = filter.with_page(page);
        }
        filter
    }
}

/// Fields accepted by `ideas update`. Absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct Changes {
    pub title: Option<String>,
    pub description: Option<String>,
    pub impact: Option<ExpectedImpact>,
    pub campaign: Option<CampaignId>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.impact.is_none()
            && self.campaign.is_none()
    }

    /// Builds the full draft the server expects from the cached idea.
    pub fn apply_to(&self, idea: &Idea) -> Result<IdeaDraft> {
        let campaign_id = match self.campaign.or(idea.campaign.as_ref().map(|c| c.id)) {
            Some(id) => id,
            None => bail!("Idea {} has no campaign; pass --campaign", idea.id),
        };

        Ok(IdeaDraft {
            title: self.title.clone().unwrap_or_else(|| idea.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| idea.description.clone()),
            expected_impact: self.impact.unwrap_or(idea.expected_impact),
            campaign_id,
        })
    }
}

pub async fn list(app: &AppBootstrap, out: Output, args: &ListArgs) -> Result<()> {
    let filter = args.filter();

    let page = if args.mine {
        require_access(app, MY_IDEAS_ROUTE)?;
        app.store.fetch_my_ideas(&filter).await
    } else {
        app.store.fetch_list(&filter).await
    }
    .map_err(|e| failure(e, FETCH_IDEAS_FALLBACK))?;

    out.emit(&page, || {
        if page.items.is_empty() {
            println!("No ideas found");
        }
        for idea in &page.items {
            print_summary(idea);
        }
        print_pagination(&page.pagination());
    })
}

pub async fn show(app: &AppBootstrap, out: Output, id: IdeaId) -> Result<()> {
    require_access(app, &idea_route(id))?;
    let idea = app
        .store
        .fetch_detail(id)
        .await
        .map_err(|e| failure(e, FETCH_IDEA_FALLBACK))?;

    out.emit(&idea, || print_detail(&idea))
}

pub async fn create(app: &AppBootstrap, out: Output, draft: IdeaDraft) -> Result<()> {
    require_access(app, SUBMIT_ROUTE)?;
    let idea = app
        .store
        .create(&draft)
        .await
        .map_err(|e| failure(e, "Failed to create idea"))?;

    out.emit(&idea, || {
        println!("Created draft idea {}", idea.id);
        print_summary(&idea);
    })
}

pub async fn update(app: &AppBootstrap, out: Output, id: IdeaId, changes: &Changes) -> Result<()> {
    require_access(app, &idea_route(id))?;
    if changes.is_empty() {
        bail!("Nothing to update: pass at least one of --title, --description, --impact, --campaign");
    }

    let current = app
        .store
        .fetch_detail(id)
        .await
        .map_err(|e| failure(e, FETCH_IDEA_FALLBACK))?;
    let draft = changes.apply_to(&current)?;

    let idea = app
        .store
        .update(id, &draft)
        .await
        .map_err(|e| failure(e, "Failed to update idea"))?;

    out.emit(&idea, || {
        println!("Updated idea {}", idea.id);
        print_summary(&idea);
    })
}

pub async fn delete(app: &AppBootstrap, out: Output, id: IdeaId) -> Result<()> {
    require_access(app, &idea_route(id))?;
    app.store
        .delete(id)
        .await
        .map_err(|e| failure(e, "Failed to delete idea"))?;
    out.message(&format!("Deleted idea {}", id))
}

pub async fn submit(app: &AppBootstrap, out: Output, id: IdeaId) -> Result<()> {
    require_access(app, &idea_route(id))?;
    let idea = app
        .store
        .submit(id)
        .await
        .map_err(|e| failure(e, "Failed to submit idea"))?;

    out.emit(&idea, || {
        println!("Submitted idea {} for evaluation", idea.id);
        print_summary(&idea);
    })
}

pub async fn add_contributor(app: &AppBootstrap, out: Output, id: IdeaId, user: UserId) -> Result<()> {
    require_access(app, &idea_route(id))?;
    app.store
        .add_contributor(id, user)
        .await
        .map_err(|e| failure(e, "Failed to add contributor"))?;
    out.message(&format!("Added user {} as contributor to idea {}", user, id))
}

pub async fn contributors(app: &AppBootstrap, out: Output, id: IdeaId) -> Result<()> {
    require_access(app, &idea_route(id))?;
    let contributors = app
        .store
        .fetch_contributors(id)
        .await
        .map_err(|e| failure(e, FETCH_CONTRIBUTORS_FALLBACK))?;

    out.emit(&contributors, || {
        if contributors.is_empty() {
            println!("No contributors");
        }
        for c in &contributors {
            println!("{:<12} {}", c.role, c.user.display_name());
        }
    })
}

pub async fn documents(app: &AppBootstrap, out: Output, id: IdeaId) -> Result<()> {
    require_access(app, &idea_route(id))?;
    let documents = app
        .store
        .fetch_documents(id)
        .await
        .map_err(|e| failure(e, FETCH_DOCUMENTS_FALLBACK))?;

    out.emit(&documents, || {
        if documents.is_empty() {
            println!("No documents");
        }
        for d in &documents {
            println!(
                "{}  {} ({} bytes, {}, scan: {})",
                d.id, d.file_name, d.file_size, d.file_type, d.virus_scan_status
            );
        }
    })
}

fn print_summary(idea: &Idea) {
    println!(
        "{}  [{}] [{}] {}",
        idea.id, idea.status, idea.expected_impact, idea.title
    );
}

fn print_detail(idea: &Idea) {
    println!("{}", idea.title);
    println!("  id:       {}", idea.id);
    println!("  status:   {}", idea.status);
    println!("  impact:   {}", idea.expected_impact);
    if let Some(campaign) = &idea.campaign {
        println!("  campaign: {} ({})", campaign.name, campaign.id);
    }
    if let Some(submitter) = &idea.submitter {
        println!("  submitter: {}", submitter.display_name());
    }
    if let Some(at) = idea.submitted_at {
        println!("  submitted: {}", at.to_rfc3339());
    }
    println!();
    println!("{}", idea.description);
}

pub(super) fn print_pagination(pagination: &Pagination) {
    let mut line = format!("page {} of {} total", pagination.page, pagination.total_count);
    if pagination.has_next {
        line.push_str(", more with --page ");
        line.push_str(&(pagination.page + 1).to_string());
    }
    println!("{}", line);
}

use anyhow::Result;
use ideahub_application::resource_store::{FETCH_CAMPAIGN_FALLBACK, FETCH_CAMPAIGNS_FALLBACK};
use ideahub_core::campaign::{CampaignId, CampaignStatus};
use ideahub_core::pagination::ListFilter;

use super::ideas::print_pagination;
use super::{Output, failure};
use crate::app::AppBootstrap;

pub async fn list(
    app: &AppBootstrap,
    out: Output,
    status: Option<CampaignStatus>,
    page: Option<u32>,
) -> Result<()> {
    let mut filter = ListFilter::new();
    if let Some(status) = status {
        filter = filter.with_status(status);
    }
    if let Some(page) = page {
        filter = filter.with_page(page);
    }

    let page = app
        .store
        .fetch_campaigns(&filter)
        .await
        .map_err(|e| failure(e, FETCH_CAMPAIGNS_FALLBACK))?;

    out.emit(&page, || {
        if page.items.is_empty() {
            println!("No campaigns found");
        }
        for campaign in &page.items {
            println!(
                "{}  [{}] {} ({} .. {})",
                campaign.id, campaign.status, campaign.name, campaign.start_date, campaign.end_date
            );
        }
        print_pagination(&page.pagination());
    })
}

pub async fn show(app: &AppBootstrap, out: Output, id: CampaignId) -> Result<()> {
    let campaign = app
        .store
        .fetch_campaign(id)
        .await
        .map_err(|e| failure(e, FETCH_CAMPAIGN_FALLBACK))?;

    out.emit(&campaign, || {
        println!("{}", campaign.name);
        println!("  id:     {}", campaign.id);
        println!("  status: {}", campaign.status);
        println!("  window: {} .. {}", campaign.start_date, campaign.end_date);
        if !campaign.description.is_empty() {
            println!();
            println!("{}", campaign.description);
        }
    })
}

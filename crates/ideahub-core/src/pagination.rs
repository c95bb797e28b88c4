//! Paginated list types.
//!
//! The server wraps every paginated list in an envelope
//! `{count, next, previous, results}`. Some actions (`my`, `contributors`,
//! `documents`) return a bare array instead; both shapes decode into
//! [`Page`].

use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::idea::ExpectedImpact;

/// Query filters for list operations. Absent values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_impact: Option<ExpectedImpact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<CampaignId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_expected_impact(mut self, impact: ExpectedImpact) -> Self {
        self.expected_impact = Some(impact);
        self
    }

    pub fn with_campaign(mut self, campaign: CampaignId) -> Self {
        self.campaign = Some(campaign);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_ordering(mut self, ordering: impl Into<String>) -> Self {
        self.ordering = Some(ordering.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// The page this filter asks for; the server defaults to the first.
    pub fn requested_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Query parameters in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(impact) = &self.expected_impact {
            pairs.push(("expected_impact", impact.to_string()));
        }
        if let Some(campaign) = &self.campaign {
            pairs.push(("campaign", campaign.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}

/// One decoded page of a server list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub page: u32,
}

impl<T> Page<T> {
    /// A page holding the complete result set.
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            total_count: items.len() as u64,
            items,
            next: None,
            previous: None,
            page: 1,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            total_count: self.total_count,
            has_next: self.next.is_some(),
            has_previous: self.previous.is_some(),
            page: self.page,
        }
    }
}

/// Position of the cached page within the server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total_count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total_count: 0,
            has_next: false,
            has_previous: false,
            page: 1,
        }
    }
}

/// The paginated envelope as sent by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Either list shape the server may answer with.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    Envelope(ListEnvelope<T>),
    Bare(Vec<T>),
}

impl<T> ListBody<T> {
    /// Converts the wire shape into a [`Page`] for the requested page number.
    pub fn into_page(self, page: u32) -> Page<T> {
        match self {
            ListBody::Envelope(envelope) => Page {
                items: envelope.results,
                total_count: envelope.count,
                next: envelope.next,
                previous: envelope.previous,
                page,
            },
            ListBody::Bare(items) => Page::complete(items),
        }
    }
}

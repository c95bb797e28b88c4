//! Idea domain model.
//!
//! The server owns ideas. The client keeps a read-mostly cached copy that is
//! refreshed on fetch and amended by local mutations until the next fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::campaign::{Campaign, CampaignId};
use crate::error::{HubError, Result};
use crate::user::{UserId, UserIdentity};

/// Server-side idea identifier.
pub type IdeaId = Uuid;

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// Review state of an idea.
///
/// Ideas start as `Draft` and only drafts can be submitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum IdeaStatus {
    Draft,
    Submitted,
    UnderEvaluation,
    Evaluated,
    Recognized,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ExpectedImpact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributorRole {
    Submitter,
    Contributor,
}

/// A user attached to an idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: Uuid,
    pub user: UserIdentity,
    pub role: ContributorRole,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VirusScanStatus {
    Pending,
    Clean,
    Infected,
}

/// Metadata of a document uploaded to an idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: Uuid,
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
    pub virus_scan_status: VirusScanStatus,
}

/// An idea as cached on the client.
///
/// List responses carry a reduced shape (no description, no nested
/// contributors or documents, counters instead), so those fields default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub expected_impact: ExpectedImpact,
    pub status: IdeaStatus,
    #[serde(default)]
    pub submitter: Option<UserIdentity>,
    #[serde(default)]
    pub campaign: Option<Campaign>,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recognized_at: Option<DateTime<Utc>>,
}

impl Idea {
    /// The submitting user's id, when the server included it.
    pub fn owner_id(&self) -> Option<UserId> {
        self.submitter.as_ref().and_then(|user| user.id)
    }

    /// The set of user ids attached as contributors.
    pub fn contributor_ids(&self) -> BTreeSet<UserId> {
        self.contributors
            .iter()
            .filter_map(|contributor| contributor.user.id)
            .collect()
    }

    pub fn is_draft(&self) -> bool {
        self.status == IdeaStatus::Draft
    }
}

/// Payload for creating or updating an idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub expected_impact: ExpectedImpact,
    pub campaign_id: CampaignId,
}

impl IdeaDraft {
    /// Returns a trimmed copy, rejecting values the server would refuse.
    pub fn normalized(&self) -> Result<Self> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > TITLE_MAX_LEN {
            return Err(HubError::validation(
                "title",
                format!("Title must be 1-{} characters", TITLE_MAX_LEN),
            ));
        }

        let description = self.description.trim();
        if description.is_empty() || description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(HubError::validation(
                "description",
                format!("Description must be 1-{} characters", DESCRIPTION_MAX_LEN),
            ));
        }

        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
            expected_impact: self.expected_impact,
            campaign_id: self.campaign_id,
        })
    }
}

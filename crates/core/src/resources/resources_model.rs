//! Domain models for the two mirrored resource kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The resource kinds mirrored from the backend. Each kind syncs independently
/// and owns its own change-list cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    News,
    Transfer,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::News, ResourceKind::Transfer];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::News => "news",
            ResourceKind::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Contract shared by every mirrored resource type.
pub trait Resource: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Stable id, unique per kind.
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResource {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_important: bool,
    pub author_name: Option<String>,
    pub author_image_url: Option<String>,
    pub url: String,
    pub topics: Vec<String>,
    pub header_image_url: Option<String>,
    pub publish_date: DateTime<Utc>,
}

impl Resource for NewsResource {
    const KIND: ResourceKind = ResourceKind::News;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResource {
    pub id: String,
    pub player_name: String,
    pub club_from: String,
    pub club_from_image_url: Option<String>,
    pub club_to: String,
    pub club_to_image_url: Option<String>,
    /// Free text as published (e.g. "€ 45m", "Loan").
    pub price: String,
    pub url: String,
}

impl Resource for TransferResource {
    const KIND: ResourceKind = ResourceKind::Transfer;

    fn id(&self) -> &str {
        &self.id
    }
}

use serde::{Deserialize, Serialize};

use super::listingmodel::{ListingKind, ListingSummary};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    /// A worker applying to a job.
    Application,
    /// A contractor bidding on a contract.
    Bid,
}

impl EngagementKind {
    pub fn to_str(&self) -> &str {
        match self {
            EngagementKind::Application => "application",
            EngagementKind::Bid => "bid",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            EngagementKind::Application => "applications",
            EngagementKind::Bid => "bids",
        }
    }

    pub fn listing_kind(&self) -> ListingKind {
        match self {
            EngagementKind::Application => ListingKind::Job,
            EngagementKind::Bid => ListingKind::Contract,
        }
    }
}

impl From<ListingKind> for EngagementKind {
    fn from(kind: ListingKind) -> Self {
        match kind {
            ListingKind::Job => EngagementKind::Application,
            ListingKind::Contract => EngagementKind::Bid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Engagement {
    #[serde(default)]
    pub id: String,
    pub listing_id: String,
    pub engager_id: String,
    #[serde(default)]
    pub engager_name: String,
    pub status: EngagementStatus,
    /// Client epoch millis.
    pub created_at: i64,
    /// Cover note sent with an application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Bid amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Bid proposal text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngagementWithListing {
    #[serde(flatten)]
    pub engagement: Engagement,
    /// `None` when the referenced listing no longer resolves.
    pub listing: Option<ListingSummary>,
}

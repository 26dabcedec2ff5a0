use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    /// Homeowner seeking labour; engaged through applications.
    Job,
    /// Homeowner seeking a contractor; engaged through bids.
    Contract,
}

impl ListingKind {
    pub fn to_str(&self) -> &str {
        match self {
            ListingKind::Job => "job",
            ListingKind::Contract => "contract",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            ListingKind::Job => "jobs",
            ListingKind::Contract => "contracts",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Open,
    Active,
    Completed,
}

impl ListingStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ListingStatus::Open => "open",
            ListingStatus::Active => "active",
            ListingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Listing {
    #[serde(default)]
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub owner_name: String,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: ListingStatus,
    #[serde(default)]
    pub applicant_count: i64,
    /// Client epoch millis.
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub budget: Option<f64>,
    pub images: Vec<String>,
}

/// The slice of a listing shown next to an engagement.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    pub location: String,
    pub status: ListingStatus,
}

impl From<Listing> for ListingSummary {
    fn from(listing: Listing) -> Self {
        ListingSummary {
            id: listing.id,
            title: listing.title,
            location: listing.location,
            status: listing.status,
        }
    }
}

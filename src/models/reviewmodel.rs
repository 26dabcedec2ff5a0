use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Review {
    #[serde(default)]
    pub id: String,
    pub worker_id: String,
    pub reviewer_id: String,
    #[serde(default)]
    pub reviewer_name: String,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Server-assigned epoch millis.
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewReview {
    pub worker_id: String,
    pub reviewer_id: String,
    pub reviewer_name: String,
    pub rating: u8,
    pub comment: Option<String>,
}

/// A worker's rating summary after a review was applied.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub rating_count: i64,
}

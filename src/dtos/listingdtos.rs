use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{engagementmodel::*, listingmodel::NewListing};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateListingDto {
    #[validate(length(min = 1, max = 120, message = "Title must be between 1-120 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, max = 120, message = "Location is required"))]
    pub location: String,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: Option<f64>,
    #[validate(length(max = 10, message = "At most 10 images"))]
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<CreateListingDto> for NewListing {
    fn from(dto: CreateListingDto) -> Self {
        NewListing {
            title: dto.title,
            description: dto.description,
            location: dto.location,
            category: dto.category,
            budget: dto.budget,
            images: dto.images,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ApplyDto {
    #[validate(length(max = 1000, message = "Message must not be more than 1000 characters"))]
    pub message: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct BidDto {
    #[validate(range(min = 1.0, message = "Bid amount must be positive"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 5000, message = "Proposal is required"))]
    pub proposal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementKindQuery {
    #[serde(default = "default_kind")]
    pub kind: EngagementKind,
}

fn default_kind() -> EngagementKind {
    EngagementKind::Application
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEngagementStatusDto {
    pub status: EngagementStatus,
}

// service/listing_service.rs
use std::sync::Arc;

use crate::{
    db::{listingdb::ListingExt, DBClient},
    models::{listingmodel::*, usermodel::*},
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct ListingService {
    db_client: Arc<DBClient>,
}

impl ListingService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Posts a job or contract on behalf of a homeowner.
    pub async fn create(&self, kind: ListingKind, owner: &Profile, listing: NewListing) -> Result<Listing, ServiceError> {
        if owner.role != UserRole::Homeowner {
            return Err(ServiceError::Unauthorized(
                owner.id.clone(),
                format!("posting a {}", kind.to_str()),
            ));
        }
        if listing.title.trim().is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }
        if listing.budget.map_or(false, |budget| budget < 0.0) {
            return Err(ServiceError::Validation("Budget cannot be negative".to_string()));
        }

        let id = self
            .db_client
            .create_listing(kind, &owner.id, &owner.name, listing)
            .await?;
        self.require(kind, &id).await
    }

    pub async fn get(&self, kind: ListingKind, listing_id: &str) -> Result<Option<Listing>, ServiceError> {
        Ok(self.db_client.get_listing(kind, listing_id).await?)
    }

    pub async fn require(&self, kind: ListingKind, listing_id: &str) -> Result<Listing, ServiceError> {
        self.get(kind, listing_id)
            .await?
            .ok_or_else(|| ServiceError::ListingNotFound(listing_id.to_string()))
    }

    pub async fn list_available(&self, kind: ListingKind) -> Result<Vec<Listing>, ServiceError> {
        Ok(self.db_client.get_available_listings(kind).await?)
    }

    pub async fn list_by_owner(&self, kind: ListingKind, owner_id: &str) -> Result<Vec<Listing>, ServiceError> {
        Ok(self.db_client.get_owner_listings(kind, owner_id).await?)
    }

    /// The listing, provided `user_id` owns it.
    pub async fn require_owned(
        &self,
        kind: ListingKind,
        listing_id: &str,
        user_id: &str,
    ) -> Result<Listing, ServiceError> {
        let listing = self.require(kind, listing_id).await?;
        if listing.owner_id != user_id {
            return Err(ServiceError::Unauthorized(user_id.to_string(), listing_id.to_string()));
        }
        Ok(listing)
    }
}

// db/listingdb.rs
use async_trait::async_trait;
use chrono::Utc;

use super::document::{encode, Direction, Filter, Query, StoreError};
use super::DBClient;
use crate::models::listingmodel::*;

pub const APPLICANT_COUNT: &str = "applicant_count";

#[async_trait]
pub trait ListingExt {
    /// Stores a new open listing with no applicants and returns its id.
    async fn create_listing(
        &self,
        kind: ListingKind,
        owner_id: &str,
        owner_name: &str,
        listing: NewListing,
    ) -> Result<String, StoreError>;

    async fn get_listing(&self, kind: ListingKind, listing_id: &str) -> Result<Option<Listing>, StoreError>;

    /// Open listings, newest first.
    async fn get_available_listings(&self, kind: ListingKind) -> Result<Vec<Listing>, StoreError>;

    /// Every listing of one owner, newest first.
    async fn get_owner_listings(&self, kind: ListingKind, owner_id: &str) -> Result<Vec<Listing>, StoreError>;

    /// Atomically bumps the denormalized engagement counter.
    async fn increment_applicant_count(&self, kind: ListingKind, listing_id: &str) -> Result<i64, StoreError>;
}

#[async_trait]
impl ListingExt for DBClient {
    async fn create_listing(
        &self,
        kind: ListingKind,
        owner_id: &str,
        owner_name: &str,
        listing: NewListing,
    ) -> Result<String, StoreError> {
        let record = Listing {
            id: String::new(),
            owner_id: owner_id.to_string(),
            owner_name: owner_name.to_string(),
            title: listing.title,
            description: listing.description,
            location: listing.location,
            category: listing.category,
            budget: listing.budget,
            images: listing.images,
            status: ListingStatus::Open,
            applicant_count: 0,
            created_at: Utc::now().timestamp_millis(),
        };

        let id = self.store.insert(kind.collection(), encode(&record)?).await?;
        tracing::info!("Created {} {} for owner {}", kind.to_str(), id, owner_id);
        Ok(id)
    }

    async fn get_listing(&self, kind: ListingKind, listing_id: &str) -> Result<Option<Listing>, StoreError> {
        self.store
            .get(kind.collection(), listing_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn get_available_listings(&self, kind: ListingKind) -> Result<Vec<Listing>, StoreError> {
        let query = Query::collection(kind.collection())
            .filter(Filter::eq("status", ListingStatus::Open.to_str()))
            .order_by("created_at", Direction::Descending);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn get_owner_listings(&self, kind: ListingKind, owner_id: &str) -> Result<Vec<Listing>, StoreError> {
        let query = Query::collection(kind.collection())
            .filter(Filter::eq("owner_id", owner_id))
            .order_by("created_at", Direction::Descending);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn increment_applicant_count(&self, kind: ListingKind, listing_id: &str) -> Result<i64, StoreError> {
        self.store
            .increment(kind.collection(), listing_id, APPLICANT_COUNT, 1)
            .await
    }
}

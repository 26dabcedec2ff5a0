// db/engagementdb.rs
use async_trait::async_trait;

use super::document::{encode, Direction, Document, Filter, Query, StoreError};
use super::DBClient;
use crate::models::engagementmodel::*;

/// Applications are keyed by (job, worker) so a second application to the
/// same job collides on insert.
pub fn application_id(job_id: &str, worker_id: &str) -> String {
    format!("{}_{}", job_id, worker_id)
}

#[async_trait]
pub trait EngagementExt {
    /// Stores an engagement. Applications use their (job, worker) key and fail
    /// with `StoreError::AlreadyExists` on a repeat; bids get a fresh id.
    async fn insert_engagement(&self, kind: EngagementKind, engagement: &Engagement) -> Result<String, StoreError>;

    async fn get_engagement(&self, kind: EngagementKind, engagement_id: &str) -> Result<Option<Engagement>, StoreError>;

    async fn get_engager_engagements(&self, kind: EngagementKind, engager_id: &str) -> Result<Vec<Engagement>, StoreError>;

    async fn get_listing_engagements(&self, kind: EngagementKind, listing_id: &str) -> Result<Vec<Engagement>, StoreError>;

    async fn update_engagement_status(
        &self,
        kind: EngagementKind,
        engagement_id: &str,
        status: EngagementStatus,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl EngagementExt for DBClient {
    async fn insert_engagement(&self, kind: EngagementKind, engagement: &Engagement) -> Result<String, StoreError> {
        let data = encode(engagement)?;
        match kind {
            EngagementKind::Application => {
                let id = application_id(&engagement.listing_id, &engagement.engager_id);
                self.store.create(kind.collection(), &id, data).await?;
                Ok(id)
            }
            EngagementKind::Bid => self.store.insert(kind.collection(), data).await,
        }
    }

    async fn get_engagement(&self, kind: EngagementKind, engagement_id: &str) -> Result<Option<Engagement>, StoreError> {
        self.store
            .get(kind.collection(), engagement_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn get_engager_engagements(&self, kind: EngagementKind, engager_id: &str) -> Result<Vec<Engagement>, StoreError> {
        let query = Query::collection(kind.collection())
            .filter(Filter::eq("engager_id", engager_id))
            .order_by("created_at", Direction::Descending);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn get_listing_engagements(&self, kind: EngagementKind, listing_id: &str) -> Result<Vec<Engagement>, StoreError> {
        let query = Query::collection(kind.collection())
            .filter(Filter::eq("listing_id", listing_id))
            .order_by("created_at", Direction::Ascending);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn update_engagement_status(
        &self,
        kind: EngagementKind,
        engagement_id: &str,
        status: EngagementStatus,
    ) -> Result<(), StoreError> {
        let mut patch = Document::new();
        patch.insert("status".to_string(), serde_json::to_value(status)?);
        self.store.update(kind.collection(), engagement_id, patch).await
    }
}

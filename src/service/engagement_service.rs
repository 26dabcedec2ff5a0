// service/engagement_service.rs
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;

use crate::{
    db::{document::StoreError, engagementdb::EngagementExt, listingdb::ListingExt, DBClient},
    models::{engagementmodel::*, listingmodel::*, usermodel::*},
    service::error::ServiceError,
};

/// Optional details carried by an application or a bid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementDetails {
    pub message: Option<String>,
    pub amount: Option<f64>,
    pub proposal: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EngagementService {
    db_client: Arc<DBClient>,
}

impl EngagementService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// A worker applies to an open job. One application per worker and job.
    pub async fn apply(&self, job_id: &str, worker: &Profile, message: Option<String>) -> Result<Engagement, ServiceError> {
        self.create(
            EngagementKind::Application,
            job_id,
            worker,
            EngagementDetails {
                message,
                ..Default::default()
            },
        )
        .await
    }

    /// A contractor bids on an open contract. Repeat bids are allowed.
    pub async fn bid(
        &self,
        contract_id: &str,
        contractor: &Profile,
        amount: f64,
        proposal: String,
    ) -> Result<Engagement, ServiceError> {
        self.create(
            EngagementKind::Bid,
            contract_id,
            contractor,
            EngagementDetails {
                amount: Some(amount),
                proposal: Some(proposal),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn create(
        &self,
        kind: EngagementKind,
        listing_id: &str,
        engager: &Profile,
        details: EngagementDetails,
    ) -> Result<Engagement, ServiceError> {
        let required_role = match kind {
            EngagementKind::Application => UserRole::Worker,
            EngagementKind::Bid => UserRole::Contractor,
        };
        if engager.role != required_role {
            return Err(ServiceError::Unauthorized(
                engager.id.clone(),
                format!("submitting a {} to {}", kind.to_str(), listing_id),
            ));
        }
        if kind == EngagementKind::Bid {
            if details.amount.map_or(true, |amount| amount <= 0.0) {
                return Err(ServiceError::Validation("Bid amount must be positive".to_string()));
            }
            if details.proposal.as_deref().map_or(true, |p| p.trim().is_empty()) {
                return Err(ServiceError::Validation("Bid proposal is required".to_string()));
            }
        }

        let listing_kind = kind.listing_kind();
        let listing = self
            .db_client
            .get_listing(listing_kind, listing_id)
            .await?
            .ok_or_else(|| ServiceError::ListingNotFound(listing_id.to_string()))?;
        if listing.status != ListingStatus::Open {
            return Err(ServiceError::ListingClosed(listing_id.to_string()));
        }

        let mut engagement = Engagement {
            id: String::new(),
            listing_id: listing_id.to_string(),
            engager_id: engager.id.clone(),
            engager_name: engager.name.clone(),
            status: EngagementStatus::Pending,
            created_at: Utc::now().timestamp_millis(),
            message: details.message,
            amount: details.amount,
            proposal: details.proposal,
        };

        engagement.id = match self.db_client.insert_engagement(kind, &engagement).await {
            Ok(id) => id,
            Err(StoreError::AlreadyExists { .. }) => {
                tracing::warn!("Worker {} already applied to job {}", engager.id, listing_id);
                return Err(ServiceError::DuplicateApplication {
                    worker_id: engager.id.clone(),
                    job_id: listing_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let count = self
            .db_client
            .increment_applicant_count(listing_kind, listing_id)
            .await?;
        tracing::info!(
            "{} {} created on {} {} ({} total)",
            kind.to_str(),
            engagement.id,
            listing_kind.to_str(),
            listing_id,
            count
        );

        Ok(engagement)
    }

    /// Ids of the listings `engager_id` has engaged with.
    pub async fn list_by_engager(&self, kind: EngagementKind, engager_id: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .db_client
            .get_engager_engagements(kind, engager_id)
            .await?
            .into_iter()
            .map(|engagement| engagement.listing_id)
            .collect())
    }

    pub async fn list_for_listing(&self, kind: EngagementKind, listing_id: &str) -> Result<Vec<Engagement>, ServiceError> {
        Ok(self.db_client.get_listing_engagements(kind, listing_id).await?)
    }

    /// The engager's records, each paired with a summary of its listing. The
    /// listing lookups run concurrently.
    pub async fn list_mine(&self, kind: EngagementKind, engager_id: &str) -> Result<Vec<EngagementWithListing>, ServiceError> {
        let engagements = self.db_client.get_engager_engagements(kind, engager_id).await?;
        let listing_kind = kind.listing_kind();

        let lookups = engagements.into_iter().map(|engagement| async move {
            let listing = self
                .db_client
                .get_listing(listing_kind, &engagement.listing_id)
                .await?;
            Ok::<_, StoreError>(EngagementWithListing {
                engagement,
                listing: listing.map(ListingSummary::from),
            })
        });

        Ok(try_join_all(lookups).await?)
    }

    /// Accepts or rejects a pending engagement. Only the listing owner may.
    pub async fn set_status(
        &self,
        kind: EngagementKind,
        engagement_id: &str,
        owner_id: &str,
        status: EngagementStatus,
    ) -> Result<Engagement, ServiceError> {
        let mut engagement = self
            .db_client
            .get_engagement(kind, engagement_id)
            .await?
            .ok_or_else(|| ServiceError::EngagementNotFound(engagement_id.to_string()))?;

        let listing = self
            .db_client
            .get_listing(kind.listing_kind(), &engagement.listing_id)
            .await?
            .ok_or_else(|| ServiceError::ListingNotFound(engagement.listing_id.clone()))?;
        if listing.owner_id != owner_id {
            return Err(ServiceError::Unauthorized(owner_id.to_string(), engagement_id.to_string()));
        }

        if engagement.status != EngagementStatus::Pending || status == EngagementStatus::Pending {
            return Err(ServiceError::InvalidStatusTransition {
                from: engagement.status,
                to: status,
            });
        }

        self.db_client
            .update_engagement_status(kind, engagement_id, status)
            .await?;
        tracing::info!("{} {} is now {:?}", kind.to_str(), engagement_id, status);

        engagement.status = status;
        Ok(engagement)
    }
}

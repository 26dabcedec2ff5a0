// service/rating_service.rs
use std::sync::Arc;

use crate::{
    db::{
        document::StoreError,
        profiledb::ProfileExt,
        reviewdb::{ReviewExt, REVIEWS},
        DBClient,
    },
    models::{reviewmodel::*, usermodel::*},
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct RatingService {
    db_client: Arc<DBClient>,
}

impl RatingService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Stores a review of a worker and folds its rating into the worker's
    /// running average.
    pub async fn submit(&self, review: NewReview) -> Result<(Review, RatingSummary), ServiceError> {
        if !(MIN_RATING..=MAX_RATING).contains(&review.rating) {
            return Err(ServiceError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if review.reviewer_id == review.worker_id {
            return Err(ServiceError::Validation("You cannot review yourself".to_string()));
        }

        let worker = self
            .db_client
            .get_profile(&review.worker_id)
            .await?
            .ok_or_else(|| ServiceError::ProfileNotFound(review.worker_id.clone()))?;
        if worker.role != UserRole::Worker {
            return Err(ServiceError::Validation(format!(
                "User {} is not a worker",
                review.worker_id
            )));
        }

        let review_id = self.db_client.insert_review(&review).await?;
        let summary = self
            .db_client
            .apply_worker_rating(&review.worker_id, review.rating)
            .await?;
        tracing::info!(
            "Review {} for worker {}: average {} over {}",
            review_id,
            review.worker_id,
            summary.average_rating,
            summary.rating_count
        );

        let stored = self
            .db_client
            .get_review(&review_id)
            .await?
            .ok_or_else(|| ServiceError::from(StoreError::not_found(REVIEWS, &review_id)))?;
        Ok((stored, summary))
    }

    pub async fn list_for_worker(&self, worker_id: &str) -> Result<Vec<Review>, ServiceError> {
        Ok(self.db_client.get_worker_reviews(worker_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> RatingService {
        let db = Arc::new(DBClient::in_memory());
        for (id, role) in [("w1", UserRole::Worker), ("h1", UserRole::Homeowner)] {
            let profile = ProfileUpdate {
                role: Some(role),
                name: Some(id.to_uppercase()),
                ..Default::default()
            };
            db.save_profile(id, &profile).await.unwrap();
        }
        RatingService::new(db)
    }

    fn review(rating: u8) -> NewReview {
        NewReview {
            worker_id: "w1".to_string(),
            reviewer_id: "h1".to_string(),
            reviewer_name: "H1".to_string(),
            rating,
            comment: Some("Clean work".to_string()),
        }
    }

    #[tokio::test]
    async fn test_reviews_update_the_running_average() {
        let ratings = service().await;
        ratings.submit(review(4)).await.unwrap();
        ratings.submit(review(4)).await.unwrap();

        let (stored, summary) = ratings.submit(review(5)).await.unwrap();
        assert_eq!(stored.rating, 5);
        assert!(stored.created_at > 0);
        assert_eq!(summary.average_rating, 4.3);
        assert_eq!(summary.rating_count, 3);

        let worker = ratings.db_client.get_profile("w1").await.unwrap().unwrap();
        assert_eq!(worker.average_rating, 4.3);
        assert_eq!(worker.rating_count, 3);
        assert_eq!(ratings.list_for_worker("w1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_reviews_are_all_counted() {
        let ratings = service().await;
        let (a, b) = tokio::join!(ratings.submit(review(5)), ratings.submit(review(3)));
        a.unwrap();
        b.unwrap();

        let worker = ratings.db_client.get_profile("w1").await.unwrap().unwrap();
        assert_eq!(worker.rating_count, 2);
        assert_eq!(worker.average_rating, 4.0);
    }

    #[tokio::test]
    async fn test_invalid_reviews_are_rejected() {
        let ratings = service().await;

        for rating in [0, 6] {
            assert!(matches!(
                ratings.submit(review(rating)).await,
                Err(ServiceError::Validation(_))
            ));
        }
        assert!(matches!(
            ratings
                .submit(NewReview {
                    worker_id: "h1".to_string(),
                    reviewer_id: "w1".to_string(),
                    ..review(5)
                })
                .await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            ratings
                .submit(NewReview {
                    worker_id: "ghost".to_string(),
                    ..review(5)
                })
                .await,
            Err(ServiceError::ProfileNotFound(_))
        ));
        assert!(ratings.list_for_worker("w1").await.unwrap().is_empty());
    }
}

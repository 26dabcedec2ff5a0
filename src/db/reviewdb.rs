// db/reviewdb.rs
use async_trait::async_trait;
use serde_json::Value;

use super::document::{encode, server_timestamp, Filter, Query, StoreError};
use super::profiledb::PROFILES;
use super::DBClient;
use crate::models::reviewmodel::*;

pub const REVIEWS: &str = "reviews";

/// Running mean after one more rating, rounded to one decimal place.
pub fn running_average(average: f64, count: i64, rating: u8) -> RatingSummary {
    let total = average * count as f64 + f64::from(rating);
    let rating_count = count + 1;
    RatingSummary {
        average_rating: (total / rating_count as f64 * 10.0).round() / 10.0,
        rating_count,
    }
}

#[async_trait]
pub trait ReviewExt {
    /// Stores a review stamped with the server clock and returns its id.
    async fn insert_review(&self, review: &NewReview) -> Result<String, StoreError>;

    async fn get_review(&self, review_id: &str) -> Result<Option<Review>, StoreError>;

    async fn get_worker_reviews(&self, worker_id: &str) -> Result<Vec<Review>, StoreError>;

    /// Folds one rating into the worker's `(average_rating, rating_count)`
    /// inside a transactional read-modify-write.
    async fn apply_worker_rating(&self, worker_id: &str, rating: u8) -> Result<RatingSummary, StoreError>;
}

#[async_trait]
impl ReviewExt for DBClient {
    async fn insert_review(&self, review: &NewReview) -> Result<String, StoreError> {
        let mut data = encode(review)?;
        data.insert("created_at".to_string(), server_timestamp());
        self.store.insert(REVIEWS, data).await
    }

    async fn get_review(&self, review_id: &str) -> Result<Option<Review>, StoreError> {
        self.store
            .get(REVIEWS, review_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn get_worker_reviews(&self, worker_id: &str) -> Result<Vec<Review>, StoreError> {
        let query = Query::collection(REVIEWS).filter(Filter::eq("worker_id", worker_id));

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn apply_worker_rating(&self, worker_id: &str, rating: u8) -> Result<RatingSummary, StoreError> {
        let written = self
            .store
            .update_with(
                PROFILES,
                worker_id,
                Box::new(move |data| {
                    let average = data.get("average_rating").and_then(Value::as_f64).unwrap_or(0.0);
                    let count = data.get("rating_count").and_then(Value::as_i64).unwrap_or(0);
                    let summary = running_average(average, count, rating);
                    data.insert("average_rating".to_string(), Value::from(summary.average_rating));
                    data.insert("rating_count".to_string(), Value::from(summary.rating_count));
                    Ok(())
                }),
            )
            .await?;

        Ok(RatingSummary {
            average_rating: written.get("average_rating").and_then(Value::as_f64).unwrap_or(0.0),
            rating_count: written.get("rating_count").and_then(Value::as_i64).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_average_rounds_to_one_decimal() {
        let summary = running_average(4.0, 2, 5);
        assert_eq!(summary.average_rating, 4.3);
        assert_eq!(summary.rating_count, 3);
    }

    #[test]
    fn test_first_rating_is_the_average() {
        let summary = running_average(0.0, 0, 4);
        assert_eq!(summary.average_rating, 4.0);
        assert_eq!(summary.rating_count, 1);
    }

    #[test]
    fn test_running_average_rounds_half_up() {
        // (4.5 * 1 + 4) / 2 = 4.25
        assert_eq!(running_average(4.5, 1, 4).average_rating, 4.3);
    }
}

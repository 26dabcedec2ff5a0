use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::reviewdtos::CreateReviewDto,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::reviewmodel::NewReview,
    AppState,
};

pub fn reviews_handler() -> Router {
    Router::new()
        .route("/", post(submit_review))
        .route("/worker/:worker_id", get(get_worker_reviews))
}

pub async fn submit_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (review, summary) = app_state
        .rating_service
        .submit(NewReview {
            worker_id: body.worker_id,
            reviewer_id: user.user_id,
            reviewer_name: user.profile.name,
            rating: body.rating,
            comment: body.comment,
        })
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "review": review,
            "rating": summary,
        }
    })))
}

pub async fn get_worker_reviews(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(worker_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let reviews = app_state.rating_service.list_for_worker(&worker_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": reviews.len(),
        "data": reviews
    })))
}

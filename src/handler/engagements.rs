use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};

use crate::{
    dtos::listingdtos::{EngagementKindQuery, UpdateEngagementStatusDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::engagementmodel::EngagementKind,
    AppState,
};

pub fn engagements_handler() -> Router {
    Router::new()
        .route("/mine", get(get_my_engagements))
        .route("/ids", get(get_my_listing_ids))
        .route("/:kind/:id/status", put(update_engagement_status))
}

fn parse_kind(kind: &str) -> Result<EngagementKind, HttpError> {
    match kind {
        "application" | "applications" => Ok(EngagementKind::Application),
        "bid" | "bids" => Ok(EngagementKind::Bid),
        other => Err(HttpError::bad_request(format!("Unknown engagement kind: {}", other))),
    }
}

pub async fn get_my_engagements(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Query(query): Query<EngagementKindQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let engagements = app_state
        .engagement_service
        .list_mine(query.kind, &user.user_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": engagements.len(),
        "data": engagements
    })))
}

pub async fn get_my_listing_ids(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Query(query): Query<EngagementKindQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let listing_ids = app_state
        .engagement_service
        .list_by_engager(query.kind, &user.user_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": listing_ids
    })))
}

pub async fn update_engagement_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path((kind, engagement_id)): Path<(String, String)>,
    Json(body): Json<UpdateEngagementStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let kind = parse_kind(&kind)?;

    let engagement = app_state
        .engagement_service
        .set_status(kind, &engagement_id, &user.user_id, body.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": engagement
    })))
}

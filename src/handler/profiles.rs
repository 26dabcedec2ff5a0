use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::userdtos::{ProfileSearchQuery, UpdateProfileDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn profiles_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/search", get(search_profiles))
        .route("/:user_id", get(get_profile))
}

pub async fn get_me(Extension(user): Extension<JWTAuthMiddeware>) -> Result<impl IntoResponse, HttpError> {
    let destination = user.profile.role.descriptor();
    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "profile": user.profile,
            "destination": destination,
        }
    })))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let profile = app_state
        .profile_service
        .save(&user.user_id, body.into())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": profile
    })))
}

pub async fn search_profiles(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<ProfileSearchQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let profiles = app_state
        .profile_service
        .search(query.role, query.q.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": profiles.len(),
        "data": profiles
    })))
}

pub async fn get_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .profile_service
        .get(&user_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Profile not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": profile
    })))
}

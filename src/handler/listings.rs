use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::listingdtos::{ApplyDto, BidDto, CreateListingDto},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::{engagementmodel::EngagementKind, listingmodel::ListingKind, usermodel::UserRole},
    AppState,
};

/// Routes for one listing kind; `/jobs` take applications, `/contracts` bids.
pub fn listings_handler(kind: ListingKind) -> Router {
    let router = Router::new()
        .route(
            "/",
            get(get_available_listings).merge(post(create_listing).layer(middleware::from_fn(
                |req, next| role_check(req, next, vec![UserRole::Homeowner]),
            ))),
        )
        .route("/mine", get(get_my_listings))
        .route("/:id", get(get_listing))
        .route("/:id/engagements", get(get_listing_engagements));

    let router = match kind {
        ListingKind::Job => router.route(
            "/:id/apply",
            post(apply_to_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Worker])
            })),
        ),
        ListingKind::Contract => router.route(
            "/:id/bid",
            post(bid_on_contract).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Contractor])
            })),
        ),
    };

    router.layer(Extension(kind))
}

pub async fn create_listing(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(kind): Extension<ListingKind>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateListingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let listing = app_state
        .listing_service
        .create(kind, &user.profile, body.into())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": listing
    })))
}

pub async fn get_available_listings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(kind): Extension<ListingKind>,
) -> Result<impl IntoResponse, HttpError> {
    let listings = app_state.listing_service.list_available(kind).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": listings.len(),
        "data": listings
    })))
}

pub async fn get_my_listings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(kind): Extension<ListingKind>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let listings = app_state
        .listing_service
        .list_by_owner(kind, &user.user_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": listings.len(),
        "data": listings
    })))
}

pub async fn get_listing(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(kind): Extension<ListingKind>,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let listing = app_state.listing_service.require(kind, &listing_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": listing
    })))
}

pub async fn get_listing_engagements(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(kind): Extension<ListingKind>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(listing_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .listing_service
        .require_owned(kind, &listing_id, &user.user_id)
        .await?;

    let engagements = app_state
        .engagement_service
        .list_for_listing(EngagementKind::from(kind), &listing_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": engagements.len(),
        "data": engagements
    })))
}

pub async fn apply_to_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<String>,
    Json(body): Json<ApplyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let application = app_state
        .engagement_service
        .apply(&job_id, &user.profile, body.message)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": application
    })))
}

pub async fn bid_on_contract(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(contract_id): Path<String>,
    Json(body): Json<BidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bid = app_state
        .engagement_service
        .bid(&contract_id, &user.profile, body.amount, body.proposal)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": bid
    })))
}

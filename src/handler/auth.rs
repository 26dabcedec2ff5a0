use std::sync::Arc;

use axum::{
    http::{header, HeaderMap},
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    dtos::{
        userdtos::{AuthData, LoginUserDto, RegisterUserDto},
        Response,
    },
    error::HttpError,
    middleware::{auth, JWTAuthMiddeware},
    models::usermodel::Profile,
    service::{error::ServiceError, profile_service::ProfileService},
    utils::token,
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout).route_layer(middleware::from_fn(auth)))
}

fn session_cookie(value: String, max_age_minutes: i64) -> Result<header::HeaderValue, HttpError> {
    let cookie = Cookie::build(("token", value))
        .path("/")
        .max_age(time::Duration::minutes(max_age_minutes))
        .http_only(true)
        .build();

    cookie
        .to_string()
        .parse()
        .map_err(|_| HttpError::server_error("Could not build session cookie"))
}

/// Issues a session for `profile`: token in the body and as a cookie, plus
/// the role's destination.
fn session_response(app_state: &AppState, profile: Profile) -> Result<axum::response::Response, HttpError> {
    let token = token::create_token(
        &profile.id,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        session_cookie(token.clone(), app_state.env.jwt_maxage)?,
    );

    let destination = profile.role.descriptor();
    let mut response = Json(serde_json::json!({
        "status": "success",
        "data": AuthData {
            token,
            profile,
            destination,
        }
    }))
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    ProfileService::check_new(&body.to_profile(&body.email))?;

    let identity = app_state
        .identity
        .create_account(&body.email, &body.password)
        .await
        .map_err(ServiceError::from)?;

    let profile = match app_state
        .profile_service
        .save(&identity.user_id, body.to_profile(&identity.email))
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            // accounts and profiles stay 1:1
            tracing::warn!("Profile save failed for {}, removing account: {}", identity.user_id, e);
            if let Err(rollback) = app_state.identity.delete_account(&identity.email).await {
                tracing::error!("Could not remove account {}: {}", identity.email, rollback);
            }
            return Err(e.into());
        }
    };
    tracing::info!("Registered {} as {}", profile.id, profile.role.to_str());

    session_response(&app_state, profile)
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let identity = app_state
        .identity
        .sign_in(&body.email, &body.password)
        .await
        .map_err(ServiceError::from)?;

    let profile = app_state.profile_service.require(&identity.user_id).await?;

    session_response(&app_state, profile)
}

pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .identity
        .sign_out(&user.user_id)
        .await
        .map_err(ServiceError::from)?;

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, session_cookie(String::new(), 0)?);

    let mut response = Json(Response {
        status: "success",
        message: "Logged out".to_string(),
    })
    .into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

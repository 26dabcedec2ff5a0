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
    dtos::{
        productdtos::{CreateProductDto, UpdateProductDto},
        Response,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn products_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_product).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Shop])
            })),
        )
        .route("/shop/:shop_id", get(get_shop_products))
        .route(
            "/:product_id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn create_product(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateProductDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let product = app_state
        .product_service
        .create(&user.profile, body.into())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": product
    })))
}

pub async fn get_shop_products(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(shop_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let products = app_state.product_service.list_by_shop(&shop_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": products.len(),
        "data": products
    })))
}

pub async fn get_product(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let product = app_state
        .product_service
        .get(&product_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Product not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": product
    })))
}

pub async fn update_product(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(product_id): Path<String>,
    Json(body): Json<UpdateProductDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let product = app_state
        .product_service
        .update(&product_id, &user.user_id, body.into())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": product
    })))
}

pub async fn delete_product(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .product_service
        .delete(&product_id, &user.user_id)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Product deleted".to_string(),
    }))
}

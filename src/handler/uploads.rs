use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};

use crate::{
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::{error::ServiceError, storage::UploadKind},
    AppState,
};

pub fn uploads_handler() -> Router {
    Router::new().route("/:kind", post(upload_file))
}

/// Raw body upload; the stored file's public URL is returned.
pub async fn upload_file(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let kind = kind.parse::<UploadKind>().map_err(HttpError::bad_request)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream");
    if !content_type.starts_with("image/") {
        return Err(HttpError::bad_request("Only image uploads are accepted"));
    }

    let path = kind.path_for(&user.user_id);
    let url = app_state
        .storage
        .upload(body.to_vec(), content_type, &path)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "path": path,
            "url": url,
        }
    })))
}

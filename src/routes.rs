use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        auth::auth_handler, chat::chat_handler, engagements::engagements_handler,
        listings::listings_handler, products::products_handler, profiles::profiles_handler,
        reviews::reviews_handler, uploads::uploads_handler,
    },
    middleware::auth,
    models::listingmodel::ListingKind,
    AppState,
};

async fn health_check(Extension(app_state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running",
        "store": app_state.db_client.backend(),
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/profiles", profiles_handler().layer(middleware::from_fn(auth)))
        .nest("/jobs", listings_handler(ListingKind::Job).layer(middleware::from_fn(auth)))
        .nest(
            "/contracts",
            listings_handler(ListingKind::Contract).layer(middleware::from_fn(auth)),
        )
        .nest("/engagements", engagements_handler().layer(middleware::from_fn(auth)))
        .nest("/chat", chat_handler().layer(middleware::from_fn(auth)))
        .nest("/reviews", reviews_handler().layer(middleware::from_fn(auth)))
        .nest("/products", products_handler().layer(middleware::from_fn(auth)))
        .nest("/uploads", uploads_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .layer(Extension(app_state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::Config,
        db::DBClient,
        error::ErrorMessage,
        service::{identity::LocalIdentityProvider, storage::MemoryBlobStorage},
    };

    fn app() -> Router {
        let db_client = DBClient::in_memory();
        let identity = Arc::new(LocalIdentityProvider::new(db_client.store.clone()));
        let app_state = AppState::new(
            Config::for_tests(),
            db_client,
            identity,
            Arc::new(MemoryBlobStorage::new()),
        );
        create_router(Arc::new(app_state))
    }

    async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = request.body(Body::from(body.to_string())).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn register(app: &Router, name: &str, role: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            serde_json::json!({
                "name": name,
                "email": format!("{}@example.com", name),
                "password": "secret1",
                "passwordConfirm": "secret1",
                "role": role,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_reports_store() {
        let (status, body) = call(&app(), Method::GET, "/health", None, Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_token() {
        let app = app();
        let (status, _) = call(&app, Method::GET, "/api/profiles/me", None, Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, Method::GET, "/api/jobs", Some("garbage"), Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let app = app();
        register(&app, "ada", "shop").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            serde_json::json!({ "email": "ada@example.com", "password": "secret1" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["profile"]["role"], "shop");
        assert_eq!(body["data"]["destination"]["route"], "shop");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            serde_json::json!({ "email": "ada@example.com", "password": "wrong-one" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect email or password.");
    }

    #[tokio::test]
    async fn test_rejected_registration_leaves_the_email_free() {
        let app = app();
        let registration = |name: &str| {
            serde_json::json!({
                "name": name,
                "email": "ada@example.com",
                "password": "secret1",
                "passwordConfirm": "secret1",
                "role": "worker",
            })
        };

        let (status, _) = call(&app, Method::POST, "/api/auth/register", None, registration("   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, Method::POST, "/api/auth/register", None, registration("Ada")).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["profile"]["name"], "Ada");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            serde_json::json!({ "email": "ada@example.com", "password": "secret1" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_job_application_flow() {
        let app = app();
        let owner = register(&app, "hana", "homeowner").await;
        let worker = register(&app, "wole", "worker").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/jobs",
            Some(&owner),
            serde_json::json!({
                "title": "Fix sink",
                "description": "Kitchen sink leaks",
                "location": "Lagos",
                "budget": 50.0,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let job_id = body["data"]["id"].as_str().unwrap().to_string();

        let apply = format!("/api/jobs/{}/apply", job_id);
        let (status, _) = call(&app, Method::POST, &apply, Some(&worker), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, Method::POST, &apply, Some(&worker), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = call(&app, Method::GET, &format!("/api/jobs/{}", job_id), Some(&worker), Value::Null).await;
        assert_eq!(body["data"]["applicant_count"], 1);
    }

    #[tokio::test]
    async fn test_roles_gate_listing_actions() {
        let app = app();
        let worker = register(&app, "wole", "worker").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/jobs",
            Some(&worker),
            serde_json::json!({
                "title": "Fix sink",
                "description": "Kitchen sink leaks",
                "location": "Lagos",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], ErrorMessage::PermissionDenied.to_string());

        let (status, _) = call(&app, Method::GET, "/api/jobs", Some(&worker), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
    }
}

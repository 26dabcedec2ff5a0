mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::{document::DocumentStore, memory::MemoryStore, postgres::PgDocumentStore, DBClient};
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use service::{
    chat_service::ChatService,
    engagement_service::EngagementService,
    identity::{log_identity_events, IdentityProvider, LocalIdentityProvider},
    listing_service::ListingService,
    product_service::ProductService,
    profile_service::ProfileService,
    rating_service::RatingService,
    storage::{BlobStorage, HttpBlobStorage, MemoryBlobStorage},
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn BlobStorage>,
    // Services
    pub profile_service: Arc<ProfileService>,
    pub listing_service: Arc<ListingService>,
    pub engagement_service: Arc<EngagementService>,
    pub chat_service: Arc<ChatService>,
    pub rating_service: Arc<RatingService>,
    pub product_service: Arc<ProductService>,
}

impl AppState {
    pub fn new(
        config: Config,
        db_client: DBClient,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        let db_client = Arc::new(db_client);

        Self {
            env: config,
            identity,
            storage,
            profile_service: Arc::new(ProfileService::new(db_client.clone())),
            listing_service: Arc::new(ListingService::new(db_client.clone())),
            engagement_service: Arc::new(EngagementService::new(db_client.clone())),
            chat_service: Arc::new(ChatService::new(db_client.clone())),
            rating_service: Arc::new(RatingService::new(db_client.clone())),
            product_service: Arc::new(ProductService::new(db_client.clone())),
            db_client,
        }
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, keeping documents in memory");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(database_url)
        .await
        .context("Failed to connect to the database")?;
    tracing::info!("Connection to the database is successful");

    let store = PgDocumentStore::connect(pool)
        .await
        .context("Failed to prepare the document store")?;
    Ok(Arc::new(store))
}

fn blob_storage(config: &Config) -> Arc<dyn BlobStorage> {
    match &config.storage {
        Some(storage) => Arc::new(HttpBlobStorage::new(
            &storage.upload_url,
            &storage.public_url,
            storage.token.clone(),
        )),
        None => {
            tracing::warn!("STORAGE_UPLOAD_URL not set, keeping uploads in memory");
            Arc::new(MemoryBlobStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::init()?;

    let level = config.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    let store = connect_store(&config).await?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new(store.clone()));
    tokio::spawn(log_identity_events(identity.identity_changes()));

    let allowed_origins = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!("Ignoring invalid origin {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(
        config.clone(),
        DBClient::new(store),
        identity,
        blob_storage(&config),
    ));

    let app = create_router(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!("Server is running on http://localhost:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}

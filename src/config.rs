// config.rs
use anyhow::Context;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_url: String,
    pub public_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// No database means the in-memory document store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token and cookie lifetime in minutes.
    pub jwt_maxage: i64,
    pub port: u16,
    /// No upload endpoint means in-memory blob storage.
    pub storage: Option<StorageConfig>,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        let jwt_secret = std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY must be set")?;
        let jwt_maxage = std::env::var("JWT_MAXAGE")
            .context("JWT_MAXAGE must be set")?
            .parse::<i64>()
            .context("JWT_MAXAGE must be a number of minutes")?;
        let port = match optional("PORT") {
            Some(port) => port.parse::<u16>().context("PORT must be a valid port number")?,
            None => 8000,
        };

        let storage = match (optional("STORAGE_UPLOAD_URL"), optional("STORAGE_PUBLIC_URL")) {
            (Some(upload_url), Some(public_url)) => Some(StorageConfig {
                upload_url,
                public_url,
                token: optional("STORAGE_TOKEN"),
            }),
            (Some(upload_url), None) => Some(StorageConfig {
                public_url: upload_url.clone(),
                upload_url,
                token: optional("STORAGE_TOKEN"),
            }),
            _ => None,
        };

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:5173".to_string(), "http://localhost:8000".to_string()]);

        Ok(Config {
            database_url: optional("DATABASE_URL"),
            jwt_secret,
            jwt_maxage,
            port,
            storage,
            allowed_origins,
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config {
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            port: 8000,
            storage: None,
            allowed_origins: Vec::new(),
            log_level: "debug".to_string(),
        }
    }
}

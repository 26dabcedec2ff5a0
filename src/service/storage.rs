// service/storage.rs
use std::collections::HashMap;
use std::fmt::Debug;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload body is empty")]
    EmptyUpload,

    #[error("Network error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage rejected upload of {path} ({status}): {body}")]
    Rejected { path: String, status: u16, body: String },
}

/// What an uploaded file is for; decides the folder it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfilePhoto,
    Logo,
    ListingImage,
    ProductImage,
}

impl UploadKind {
    pub fn folder(&self) -> &'static str {
        match self {
            UploadKind::ProfilePhoto => "profile-photos",
            UploadKind::Logo => "logos",
            UploadKind::ListingImage => "listing-images",
            UploadKind::ProductImage => "product-images",
        }
    }

    /// `{folder}/{user_id}/{uuid}`; a fresh name per upload.
    pub fn path_for(&self, user_id: &str) -> String {
        format!("{}/{}/{}", self.folder(), user_id, Uuid::new_v4())
    }
}

impl FromStr for UploadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile-photos" => Ok(UploadKind::ProfilePhoto),
            "logos" => Ok(UploadKind::Logo),
            "listing-images" => Ok(UploadKind::ListingImage),
            "product-images" => Ok(UploadKind::ProductImage),
            other => Err(format!("Unknown upload kind: {}", other)),
        }
    }
}

#[async_trait]
pub trait BlobStorage: Send + Sync + Debug {
    /// Stores `bytes` at `path` and returns the public URL.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str, path: &str) -> Result<String, StorageError>;
}

#[derive(Debug, Clone)]
pub struct HttpBlobStorage {
    client: reqwest::Client,
    upload_url: String,
    public_url: String,
    token: Option<String>,
}

impl HttpBlobStorage {
    pub fn new(upload_url: &str, public_url: &str, token: Option<String>) -> Self {
        HttpBlobStorage {
            client: reqwest::Client::new(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn public_url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, path)
    }
}

#[async_trait]
impl BlobStorage for HttpBlobStorage {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str, path: &str) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyUpload);
        }

        let mut request = self
            .client
            .put(format!("{}/{}", self.upload_url, path))
            .header("Content-Type", content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            tracing::error!("Upload of {} failed with HTTP {}", path, status);
            return Err(StorageError::Rejected {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Uploaded {}", path);
        Ok(self.public_url_for(path))
    }
}

/// In-process storage for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    blobs: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and bytes stored at `path`.
    pub async fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str, path: &str) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyUpload);
        }
        self.blobs
            .write()
            .await
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("memory://{}", path))
    }
}

// db.rs
pub mod chatdb;
pub mod document;
pub mod engagementdb;
pub mod listingdb;
pub mod memory;
pub mod postgres;
pub mod productdb;
pub mod profiledb;
pub mod reviewdb;
pub mod subscription;

use std::sync::Arc;

use document::DocumentStore;
use memory::MemoryStore;

#[derive(Clone)]
pub struct DBClient {
    pub store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("backend", &self.store.backend())
            .finish()
    }
}

impl DBClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        DBClient { store }
    }

    /// Client over a fresh in-process store.
    pub fn in_memory() -> Self {
        DBClient::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}

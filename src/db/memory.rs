// db/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::document::{
    compare_values, resolve_server_timestamps, Direction, Document, DocumentStore, Query,
    StoreError, StoredDocument, UpdateFn,
};

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug)]
struct Entry {
    seq: u64,
    data: Document,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, HashMap<String, Entry>>,
    next_seq: u64,
    last_timestamp: i64,
}

impl State {
    /// Server clock: wall time in millis, strictly increasing per write.
    fn tick(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        self.last_timestamp = now;
        now
    }

    fn put(&mut self, collection: &str, id: &str, mut data: Document) {
        let now = self.tick();
        resolve_server_timestamps(&mut data, now);
        self.next_seq += 1;
        let seq = self.next_seq;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), Entry { seq, data });
    }

    fn entry_mut(&mut self, collection: &str, id: &str) -> Result<&mut Entry, StoreError> {
        self.collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    fn merge(&mut self, collection: &str, id: &str, mut data: Document) -> Result<(), StoreError> {
        let now = self.tick();
        resolve_server_timestamps(&mut data, now);
        let entry = self.entry_mut(collection, id)?;
        for (key, value) in data {
            entry.data.insert(key, value);
        }
        Ok(())
    }
}

/// In-process document store used for development and tests.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    tx: broadcast::Sender<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        MemoryStore {
            state: RwLock::new(State::default()),
            tx,
        }
    }

    fn announce(&self, collection: &str) {
        if self.tx.send(collection.to_string()).is_err() {
            tracing::trace!("No subscriber listening for changes on {}", collection);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        {
            let mut state = self.state.write().await;
            state.put(collection, &id, data);
        }
        self.announce(collection);
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        {
            let mut state = self.state.write().await;
            let exists = state
                .collections
                .get(collection)
                .map(|docs| docs.contains_key(id))
                .unwrap_or(false);
            if exists {
                return Err(StoreError::already_exists(collection, id));
            }
            state.put(collection, id, data);
        }
        self.announce(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| StoredDocument {
                id: id.to_string(),
                data: entry.data.clone(),
            }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        let Some(docs) = state.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(&String, &Entry)> = docs
            .iter()
            .filter(|(_, entry)| query.matches(&entry.data))
            .collect();

        hits.sort_by(|(_, a), (_, b)| {
            let by_field = match &query.order_by {
                Some((field, Direction::Ascending)) => {
                    compare_values(a.data.get(field), b.data.get(field))
                }
                Some((field, Direction::Descending)) => {
                    compare_values(b.data.get(field), a.data.get(field))
                }
                None => std::cmp::Ordering::Equal,
            };
            match (&query.order_by, by_field) {
                (Some((_, Direction::Descending)), std::cmp::Ordering::Equal) => b.seq.cmp(&a.seq),
                (_, std::cmp::Ordering::Equal) => a.seq.cmp(&b.seq),
                (_, ordering) => ordering,
            }
        });

        Ok(hits
            .into_iter()
            .map(|(id, entry)| StoredDocument {
                id: id.clone(),
                data: entry.data.clone(),
            })
            .collect())
    }

    async fn set_merge(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        {
            let mut state = self.state.write().await;
            let exists = state
                .collections
                .get(collection)
                .map(|docs| docs.contains_key(id))
                .unwrap_or(false);
            if exists {
                state.merge(collection, id, data)?;
            } else {
                state.put(collection, id, data);
            }
        }
        self.announce(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        {
            let mut state = self.state.write().await;
            state.merge(collection, id, data)?;
        }
        self.announce(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        {
            let mut state = self.state.write().await;
            let removed = state
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id));
            if removed.is_none() {
                return Err(StoreError::not_found(collection, id));
            }
        }
        self.announce(collection);
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let value = {
            let mut state = self.state.write().await;
            let entry = state.entry_mut(collection, id)?;
            let current = match entry.data.get(field) {
                None | Some(Value::Null) => 0,
                Some(value) => value.as_i64().ok_or_else(|| StoreError::NotAnInteger {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    field: field.to_string(),
                })?,
            };
            let next = current + delta;
            entry.data.insert(field.to_string(), Value::from(next));
            next
        };
        self.announce(collection);
        Ok(value)
    }

    async fn update_with(
        &self,
        collection: &str,
        id: &str,
        apply: UpdateFn,
    ) -> Result<Document, StoreError> {
        let written = {
            let mut state = self.state.write().await;
            let mut data = state.entry_mut(collection, id)?.data.clone();
            apply(&mut data)?;
            let now = state.tick();
            resolve_server_timestamps(&mut data, now);
            state.entry_mut(collection, id)?.data = data.clone();
            data
        };
        self.announce(collection);
        Ok(written)
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::db::document::{server_timestamp, Filter};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let id = store.insert("jobs", doc(json!({ "title": "Fix roof" }))).await.unwrap();

        let found = store.get("jobs", &id).await.unwrap().unwrap();
        assert_eq!(found.data.get("title"), Some(&json!("Fix roof")));
        assert!(store.get("jobs", "missing").await.unwrap().is_none());
        assert!(store.get("other", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id() {
        let store = MemoryStore::new();
        store.create("applications", "j_w", doc(json!({ "n": 1 }))).await.unwrap();

        let err = store
            .create("applications", "j_w", doc(json!({ "n": 2 })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        let kept = store.get("applications", "j_w").await.unwrap().unwrap();
        assert_eq!(kept.data.get("n"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_set_merge_keeps_unsupplied_fields() {
        let store = MemoryStore::new();
        store
            .set_merge("profiles", "u1", doc(json!({ "name": "Ada", "role": "worker" })))
            .await
            .unwrap();
        store
            .set_merge("profiles", "u1", doc(json!({ "phone": "0800" })))
            .await
            .unwrap();

        let profile = store.get("profiles", "u1").await.unwrap().unwrap();
        assert_eq!(profile.data.get("name"), Some(&json!("Ada")));
        assert_eq!(profile.data.get("role"), Some(&json!("worker")));
        assert_eq!(profile.data.get("phone"), Some(&json!("0800")));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_documents_fail() {
        let store = MemoryStore::new();
        let err = store.update("products", "nope", doc(json!({ "a": 1 }))).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = store.delete("products", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let store = MemoryStore::new();
        for (title, status, created_at) in [
            ("a", "open", 10),
            ("b", "completed", 20),
            ("c", "open", 30),
            ("d", "open", 30),
        ] {
            store
                .insert(
                    "jobs",
                    doc(json!({ "title": title, "status": status, "created_at": created_at })),
                )
                .await
                .unwrap();
        }

        let query = Query::collection("jobs")
            .filter(Filter::eq("status", "open"))
            .order_by("created_at", Direction::Descending);
        let titles: Vec<Value> = store
            .query(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.data["title"].clone())
            .collect();

        // equal timestamps: newest insert first when descending
        assert_eq!(titles, vec![json!("d"), json!("c"), json!("a")]);
    }

    #[tokio::test]
    async fn test_server_timestamps_strictly_increase() {
        let store = MemoryStore::new();
        let mut last = 0;
        for _ in 0..20 {
            let id = store
                .insert("messages", doc(json!({ "timestamp": server_timestamp() })))
                .await
                .unwrap();
            let ts = store.get("messages", &id).await.unwrap().unwrap().data["timestamp"]
                .as_i64()
                .unwrap();
            assert!(ts > last);
            last = ts;
        }
    }

    #[tokio::test]
    async fn test_increment_is_atomic_under_concurrency() {
        let store = Arc::new(MemoryStore::new());
        store
            .create("jobs", "j1", doc(json!({ "applicant_count": 0 })))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment("jobs", "j1", "applicant_count", 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let job = store.get("jobs", "j1").await.unwrap().unwrap();
        assert_eq!(job.data["applicant_count"], json!(50));
    }

    #[tokio::test]
    async fn test_increment_rejects_non_integer_fields() {
        let store = MemoryStore::new();
        store.create("jobs", "j1", doc(json!({ "title": "x" }))).await.unwrap();
        let err = store.increment("jobs", "j1", "title", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnInteger { .. }));
    }

    #[tokio::test]
    async fn test_update_with_aborts_without_writing() {
        let store = MemoryStore::new();
        store.create("profiles", "w", doc(json!({ "rating_count": 1 }))).await.unwrap();

        let result = store
            .update_with(
                "profiles",
                "w",
                Box::new(|data| {
                    data.insert("rating_count".to_string(), json!(99));
                    Err(StoreError::InvalidDocument("stop".to_string()))
                }),
            )
            .await;
        assert!(result.is_err());

        let profile = store.get("profiles", "w").await.unwrap().unwrap();
        assert_eq!(profile.data["rating_count"], json!(1));
    }

    #[tokio::test]
    async fn test_writes_are_announced() {
        let store = MemoryStore::new();
        let mut changes = store.changes();
        store.insert("reviews", doc(json!({}))).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), "reviews");
    }
}

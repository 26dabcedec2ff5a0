// db/document.rs
use std::cmp::Ordering;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

/// A stored record: a JSON object without its id.
pub type Document = Map<String, Value>;

/// Closure applied to a document inside a transactional read-modify-write.
pub type UpdateFn = Box<dyn FnOnce(&mut Document) -> Result<(), StoreError> + Send>;

const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// Placeholder the store replaces with its own clock (epoch millis) at write time.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_KEY: true })
}

pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.len() == 1 && obj.get(SERVER_TIMESTAMP_KEY) == Some(&Value::Bool(true)))
        .unwrap_or(false)
}

pub fn has_server_timestamps(data: &Document) -> bool {
    data.values().any(is_server_timestamp)
}

/// Replaces every top-level server timestamp placeholder with `now`.
pub fn resolve_server_timestamps(data: &mut Document, now: i64) {
    for value in data.values_mut() {
        if is_server_timestamp(value) {
            *value = Value::from(now);
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("Field {field} of {collection}/{id} is not an integer")]
    NotAnInteger {
        collection: String,
        id: String,
        field: String,
    },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(collection: &str, id: &str) -> Self {
        StoreError::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    ArrayContains(String, Value),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains(field.to_string(), value.into())
    }

    pub fn matches(&self, data: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => data.get(field) == Some(value),
            Filter::ArrayContains(field, value) => data
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality query over one collection. Results are ordered by `order_by` when
/// set, ties (and unordered queries) fall back to insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Query {
            collection: name.to_string(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn matches(&self, data: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(data))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    /// Deserializes the document into a typed record, exposing the id as `id`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut data = self.data;
        data.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Serializes a typed record into a document. The `id` field is never stored.
pub fn encode<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(mut data) => {
            data.remove("id");
            Ok(data)
        }
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Orders two optional field values: missing and null sort first, numbers
/// numerically, strings lexicographically.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Collection-oriented document store backing every marketplace store.
///
/// Every successful write announces the written collection on the change
/// feed returned by [`DocumentStore::changes`].
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Inserts a document under a generated id and returns the id.
    async fn insert(&self, collection: &str, data: Document) -> Result<String, StoreError>;

    /// Inserts a document under a caller-chosen id. Fails with
    /// [`StoreError::AlreadyExists`] when the id is taken.
    async fn create(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError>;

    /// Merge upsert: creates the document when absent, otherwise overwrites
    /// only the supplied top-level fields.
    async fn set_merge(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    /// Merge update of an existing document.
    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Atomically adds `delta` to an integer field (missing counts as 0) and
    /// returns the new value.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError>;

    /// Transactional read-modify-write of one document. Returns the written
    /// document.
    async fn update_with(
        &self,
        collection: &str,
        id: &str,
        apply: UpdateFn,
    ) -> Result<Document, StoreError>;

    /// Change feed carrying the collection name of every write.
    fn changes(&self) -> broadcast::Receiver<String>;

    fn backend(&self) -> &'static str;
}

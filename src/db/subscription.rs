// db/subscription.rs
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use super::document::{DocumentStore, Query, StoreError, StoredDocument};

const SNAPSHOT_BUFFER: usize = 16;

pub type Snapshot<T> = Result<Vec<T>, StoreError>;

/// Live view over a query. Yields the full, ordered result set once on
/// subscribe and again after every write to the queried collection.
///
/// Dropping the handle or calling [`Subscription::cancel`] detaches the view;
/// no snapshot is yielded after cancellation.
pub struct Subscription<T> {
    snapshots: ReceiverStream<Snapshot<T>>,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl<T: Send + 'static> Subscription<T> {
    pub fn watch<F>(store: Arc<dyn DocumentStore>, query: Query, decode: F) -> Self
    where
        F: Fn(StoredDocument) -> Result<T, StoreError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        // subscribe before the first read so no write slips between the two
        let mut changes = store.changes();

        let task = tokio::spawn(async move {
            loop {
                let snapshot = match store.query(&query).await {
                    Ok(docs) => docs.into_iter().map(&decode).collect::<Result<Vec<T>, _>>(),
                    Err(e) => {
                        tracing::error!("Live query on {} failed: {}", query.collection, e);
                        Err(e)
                    }
                };

                if tx.send(snapshot).await.is_err() {
                    return;
                }

                loop {
                    match changes.recv().await {
                        Ok(collection) if collection == query.collection => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(
                                "Live query on {} lagged by {} changes, re-reading",
                                query.collection,
                                skipped
                            );
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        Subscription {
            snapshots: ReceiverStream::new(rx),
            task,
            cancelled: false,
        }
    }
}

impl<T> Subscription<T> {
    /// Detaches the live view. Buffered snapshots are discarded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.task.abort();
        self.snapshots.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = Snapshot<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        Pin::new(&mut this.snapshots).poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use serde_json::{json, Value};

    use super::*;
    use crate::db::document::{Direction, Document};
    use crate::db::memory::MemoryStore;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn titles(store: Arc<dyn DocumentStore>) -> Subscription<String> {
        Subscription::watch(
            store,
            Query::collection("jobs").order_by("n", Direction::Ascending),
            |d| Ok(d.data["title"].as_str().unwrap_or_default().to_string()),
        )
    }

    #[tokio::test]
    async fn test_delivers_initial_and_updated_snapshots() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store.insert("jobs", doc(json!({ "title": "a", "n": 1 }))).await.unwrap();

        let mut sub = titles(store.clone());
        assert_eq!(sub.next().await.unwrap().unwrap(), vec!["a"]);

        store.insert("jobs", doc(json!({ "title": "b", "n": 2 }))).await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_ignores_other_collections() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut sub = titles(store.clone());
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        store.insert("contracts", doc(json!({ "title": "x" }))).await.unwrap();
        let next = tokio::time::timeout(Duration::from_millis(100), sub.next()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn test_nothing_delivered_after_cancel() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut sub = titles(store.clone());
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        store.insert("jobs", doc(json!({ "title": "a", "n": 1 }))).await.unwrap();
        sub.cancel();
        store.insert("jobs", doc(json!({ "title": "b", "n": 2 }))).await.unwrap();

        assert!(sub.is_cancelled());
        assert!(sub.next().await.is_none());
    }
}

// db/chatdb.rs
use async_trait::async_trait;
use serde_json::{json, Value};

use super::document::{server_timestamp, Direction, Filter, Query, StoreError};
use super::DBClient;
use crate::models::chatmodels::*;

pub const CONVERSATIONS: &str = "conversations";

/// Each conversation owns its own message collection.
pub fn messages_collection(conversation_id: &str) -> String {
    format!("{}/{}/messages", CONVERSATIONS, conversation_id)
}

/// All messages of a conversation, oldest first.
pub fn messages_query(conversation_id: &str) -> Query {
    Query::collection(&messages_collection(conversation_id)).order_by("timestamp", Direction::Ascending)
}

/// Conversations a user takes part in, most recent activity first.
pub fn conversations_query(user_id: &str) -> Query {
    Query::collection(CONVERSATIONS)
        .filter(Filter::array_contains("participants", user_id))
        .order_by("last_timestamp", Direction::Descending)
}

fn as_document(value: Value) -> Result<super::document::Document, StoreError> {
    match value {
        Value::Object(data) => Ok(data),
        other => Err(StoreError::InvalidDocument(other.to_string())),
    }
}

#[async_trait]
pub trait ChatExt {
    /// Appends a message stamped with the server clock and returns its id.
    async fn append_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<String, StoreError>;

    async fn get_message(&self, conversation_id: &str, message_id: &str) -> Result<Option<Message>, StoreError>;

    /// Merge upsert of the conversation summary after a send.
    async fn upsert_conversation(
        &self,
        conversation_id: &str,
        participants: [&str; 2],
        last_message: &str,
        last_sender_id: &str,
    ) -> Result<(), StoreError>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>, StoreError>;

    async fn get_conversation_messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError>;

    async fn get_user_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, StoreError>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn append_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<String, StoreError> {
        let data = as_document(json!({
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "text": text,
            "timestamp": server_timestamp(),
        }))?;

        self.store
            .insert(&messages_collection(conversation_id), data)
            .await
    }

    async fn get_message(&self, conversation_id: &str, message_id: &str) -> Result<Option<Message>, StoreError> {
        self.store
            .get(&messages_collection(conversation_id), message_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn upsert_conversation(
        &self,
        conversation_id: &str,
        participants: [&str; 2],
        last_message: &str,
        last_sender_id: &str,
    ) -> Result<(), StoreError> {
        let mut participants = participants;
        participants.sort();

        let data = as_document(json!({
            "participants": participants,
            "last_message": last_message,
            "last_sender_id": last_sender_id,
            "last_timestamp": server_timestamp(),
        }))?;

        self.store.set_merge(CONVERSATIONS, conversation_id, data).await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>, StoreError> {
        self.store
            .get(CONVERSATIONS, conversation_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn get_conversation_messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        self.store
            .query(&messages_query(conversation_id))
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn get_user_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, StoreError> {
        self.store
            .query(&conversations_query(user_id))
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }
}

// service/chat_service.rs
use std::sync::Arc;

use crate::{
    db::{
        chatdb::{conversations_query, messages_collection, messages_query, ChatExt},
        document::StoreError,
        profiledb::ProfileExt,
        subscription::Subscription,
        DBClient,
    },
    models::chatmodels::*,
    service::error::ServiceError,
};

pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Id of the 1:1 conversation between two users, independent of order.
pub fn conversation_id(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{}", first, second)
}

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Appends a message and refreshes the conversation summary. The text is
    /// stored as sent; whitespace-only text is rejected.
    pub async fn send(&self, sender_id: &str, receiver_id: &str, text: &str) -> Result<Message, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::Validation("Message cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Message must not be more than {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        if sender_id == receiver_id {
            return Err(ServiceError::Validation("Cannot send a message to yourself".to_string()));
        }
        if self.db_client.get_profile(receiver_id).await?.is_none() {
            return Err(ServiceError::ProfileNotFound(receiver_id.to_string()));
        }

        let cid = conversation_id(sender_id, receiver_id);
        let message_id = self
            .db_client
            .append_message(&cid, sender_id, receiver_id, text)
            .await?;
        self.db_client
            .upsert_conversation(&cid, [sender_id, receiver_id], text, sender_id)
            .await?;
        tracing::info!("Message {} sent in conversation {}", message_id, cid);

        self.db_client
            .get_message(&cid, &message_id)
            .await?
            .ok_or_else(|| ServiceError::from(StoreError::not_found(&messages_collection(&cid), &message_id)))
    }

    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, ServiceError> {
        Ok(self.db_client.get_conversation_messages(conversation_id).await?)
    }

    pub async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self.db_client.get_user_conversations(user_id).await?)
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>, ServiceError> {
        Ok(self.db_client.get_conversation(conversation_id).await?)
    }

    /// Fails unless `user_id` is one of the two participants. A conversation
    /// with no messages yet is judged by its id.
    pub async fn require_participant(&self, conversation_id: &str, user_id: &str) -> Result<(), ServiceError> {
        let allowed = match self.db_client.get_conversation(conversation_id).await? {
            Some(conversation) => conversation.includes(user_id),
            None => {
                conversation_id.starts_with(&format!("{}_", user_id))
                    || conversation_id.ends_with(&format!("_{}", user_id))
            }
        };

        if !allowed {
            tracing::warn!("User {} is not part of conversation {}", user_id, conversation_id);
            return Err(ServiceError::Unauthorized(
                user_id.to_string(),
                conversation_id.to_string(),
            ));
        }
        Ok(())
    }

    /// Live message list of a conversation, oldest first.
    pub fn subscribe_messages(&self, conversation_id: &str) -> Subscription<Message> {
        tracing::debug!("Watching messages of {}", conversation_id);
        Subscription::watch(
            self.db_client.store.clone(),
            messages_query(conversation_id),
            |doc| doc.decode(),
        )
    }

    /// Live conversation list of a user, most recent first.
    pub fn subscribe_conversations(&self, user_id: &str) -> Subscription<Conversation> {
        tracing::debug!("Watching conversations of {}", user_id);
        Subscription::watch(
            self.db_client.store.clone(),
            conversations_query(user_id),
            |doc| doc.decode(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::models::usermodel::{ProfileUpdate, UserRole};

    async fn service_with_users(ids: &[&str]) -> ChatService {
        let db = Arc::new(DBClient::in_memory());
        for id in ids {
            let profile = ProfileUpdate {
                role: Some(UserRole::Worker),
                name: Some(id.to_string()),
                ..Default::default()
            };
            db.save_profile(id, &profile).await.unwrap();
        }
        ChatService::new(db)
    }

    #[test]
    fn test_conversation_id_is_symmetric() {
        assert_eq!(conversation_id("alice", "bob"), "alice_bob");
        assert_eq!(conversation_id("bob", "alice"), "alice_bob");
        assert_eq!(conversation_id("u2", "u10"), conversation_id("u10", "u2"));
    }

    #[tokio::test]
    async fn test_messaging_round_trip() {
        let chat = service_with_users(&["a", "b"]).await;
        let cid = conversation_id("a", "b");

        chat.send("a", "b", "hello").await.unwrap();
        let conversation = chat.get_conversation(&cid).await.unwrap().unwrap();
        assert_eq!(conversation.last_message, "hello");
        assert_eq!(conversation.participants, vec!["a".to_string(), "b".to_string()]);

        chat.send("b", "a", "hi").await.unwrap();
        assert_eq!(conversation_id("b", "a"), cid);
        let conversation = chat.get_conversation(&cid).await.unwrap().unwrap();
        assert_eq!(conversation.last_message, "hi");
        assert_eq!(conversation.last_sender_id, "b");

        let texts: Vec<String> = chat
            .messages(&cid)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["hello", "hi"]);
    }

    #[tokio::test]
    async fn test_text_is_stored_as_sent() {
        let chat = service_with_users(&["a", "b"]).await;
        let sent = chat.send("a", "b", "  see you\n at 9  ").await.unwrap();
        assert_eq!(sent.text, "  see you\n at 9  ");

        let conversation = chat.get_conversation(&conversation_id("a", "b")).await.unwrap().unwrap();
        assert_eq!(conversation.last_message, "  see you\n at 9  ");
    }

    #[tokio::test]
    async fn test_send_rejects_bad_messages() {
        let chat = service_with_users(&["a", "b"]).await;

        assert!(matches!(chat.send("a", "b", "   ").await, Err(ServiceError::Validation(_))));
        assert!(matches!(chat.send("a", "a", "hello").await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            chat.send("a", "ghost", "hello").await,
            Err(ServiceError::ProfileNotFound(_))
        ));
        assert!(chat.conversations("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conversations_are_most_recent_first() {
        let chat = service_with_users(&["a", "b", "c"]).await;
        chat.send("a", "b", "first").await.unwrap();
        chat.send("c", "a", "second").await.unwrap();

        let ids: Vec<String> = chat
            .conversations("a")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![conversation_id("a", "c"), conversation_id("a", "b")]);
        assert_eq!(chat.conversations("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_participants_read_a_conversation() {
        let chat = service_with_users(&["a", "b", "c"]).await;
        let cid = conversation_id("a", "b");

        chat.require_participant(&cid, "a").await.unwrap();
        assert!(chat.require_participant(&cid, "c").await.is_err());

        chat.send("a", "b", "hello").await.unwrap();
        chat.require_participant(&cid, "b").await.unwrap();
        assert!(matches!(
            chat.require_participant(&cid, "c").await,
            Err(ServiceError::Unauthorized(_, _))
        ));
    }

    #[tokio::test]
    async fn test_message_subscription_follows_sends() {
        let chat = service_with_users(&["a", "b"]).await;
        let cid = conversation_id("a", "b");
        let mut live = chat.subscribe_messages(&cid);

        assert!(live.next().await.unwrap().unwrap().is_empty());

        chat.send("a", "b", "hello").await.unwrap();
        let snapshot = live.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text, "hello");

        live.cancel();
        chat.send("b", "a", "hi").await.unwrap();
        let after = tokio::time::timeout(Duration::from_millis(100), live.next()).await;
        assert!(matches!(after, Ok(None)));
    }

    #[tokio::test]
    async fn test_conversation_subscription_sees_new_threads() {
        let chat = service_with_users(&["a", "b"]).await;
        let mut live = chat.subscribe_conversations("b");
        assert!(live.next().await.unwrap().unwrap().is_empty());

        chat.send("a", "b", "hello").await.unwrap();
        // the message append and the summary upsert are separate writes
        let snapshot = loop {
            let snapshot = live.next().await.unwrap().unwrap();
            if !snapshot.is_empty() {
                break snapshot;
            }
        };
        assert_eq!(snapshot[0].last_message, "hello");
        assert_eq!(snapshot[0].other_participant("b"), Some("a"));
    }
}

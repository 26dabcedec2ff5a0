use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::Path,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use validator::Validate;

use crate::{
    db::subscription::Subscription,
    dtos::chatdtos::{ConversationIdDto, SendMessageDto},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::chat_service::conversation_id,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/messages", post(send_message))
        .route("/conversations", get(get_conversations))
        .route("/conversations/stream", get(stream_conversations))
        .route("/conversations/:conversation_id/messages", get(get_messages))
        .route("/conversations/:conversation_id/stream", get(stream_messages))
        .route("/conversation-id/:other_user_id", get(get_conversation_id))
}

/// One `snapshot` event per live result set. A failed read becomes an
/// `error` event; the stream stays open.
fn snapshot_events<T>(subscription: Subscription<T>) -> impl Stream<Item = Result<Event, Infallible>>
where
    T: Serialize + Send + 'static,
{
    subscription.map(|snapshot| {
        let event = match snapshot {
            Ok(items) => Event::default().event("snapshot").json_data(items),
            Err(e) => {
                tracing::error!("Live chat query failed: {}", e);
                Ok(Event::default().event("error").data("Live update failed"))
            }
        };
        Ok(event.unwrap_or_else(|e| {
            tracing::error!("Could not encode snapshot: {}", e);
            Event::default().event("error").data("Live update failed")
        }))
    })
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .chat_service
        .send(&user.user_id, &body.receiver_id, &body.text)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": message
    })))
}

pub async fn get_conversations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let conversations = app_state.chat_service.conversations(&user.user_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": conversations.len(),
        "data": conversations
    })))
}

pub async fn stream_conversations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let subscription = app_state.chat_service.subscribe_conversations(&user.user_id);

    Ok(Sse::new(snapshot_events(subscription)).keep_alive(KeepAlive::default()))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .chat_service
        .require_participant(&conversation_id, &user.user_id)
        .await?;

    let messages = app_state.chat_service.messages(&conversation_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": messages.len(),
        "data": messages
    })))
}

pub async fn stream_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .chat_service
        .require_participant(&conversation_id, &user.user_id)
        .await?;

    let subscription = app_state.chat_service.subscribe_messages(&conversation_id);

    Ok(Sse::new(snapshot_events(subscription)).keep_alive(KeepAlive::default()))
}

pub async fn get_conversation_id(
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(other_user_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ConversationIdDto {
            conversation_id: conversation_id(&user.user_id, &other_user_id),
        }
    })))
}

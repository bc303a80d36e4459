use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    store::{Message, Store},
    validate::{self, Validate, ValidJson},
    AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send))
        .route("/{id}", get(conversation))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendMessage {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    content: String,
}

impl Validate for SendMessage {
    fn validate(&self) -> Result<(), String> {
        validate::required("from", &self.from)?;
        validate::required("to", &self.to)?;
        validate::required("content", &self.content)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Sent {
    success: bool,
    message: Message,
}

/// Stores a message and files it in both inboxes.
#[debug_handler(state = AppState)]
pub(crate) async fn send(
    State(store): State<Store>,
    ValidJson(SendMessage { from, to, content }): ValidJson<SendMessage>,
) -> AppResult<(StatusCode, Json<Sent>)> {
    let message = store
        .write(move |data| {
            for id in [&from, &to] {
                if data.user(id).is_none() {
                    return Err(AppError::not_found(format!("user {id}")));
                }
            }

            let message = Message {
                id: Uuid::now_v7().to_string(),
                from,
                to,
                content,
                timestamp: OffsetDateTime::now_utc(),
                read: false,
            };
            for id in [&message.from, &message.to] {
                if let Some(user) = data.user_mut(id) {
                    if !user.inbox.contains(&message.id) {
                        user.inbox.push(message.id.clone());
                    }
                }
            }
            data.messages.push(message.clone());
            Ok(message)
        })
        .await?;

    info!(message_id = %message.id, from = %message.from, to = %message.to, "message sent");
    Ok((StatusCode::CREATED, Json(Sent { success: true, message })))
}

/// Every message the user sent or received, oldest first.
#[debug_handler(state = AppState)]
pub(crate) async fn conversation(
    Path(id): Path<String>,
    State(store): State<Store>,
) -> AppResult<Json<Vec<Message>>> {
    let mut messages = store
        .read(move |data| -> AppResult<Vec<Message>> {
            if data.user(&id).is_none() {
                return Err(AppError::not_found(format!("user {id}")));
            }
            Ok(data
                .messages
                .iter()
                .filter(|m| m.from == id || m.to == id)
                .cloned()
                .collect())
        })
        .await??;

    messages.sort_by_key(|m| m.timestamp);
    Ok(Json(messages))
}

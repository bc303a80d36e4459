use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::store::Role;

use super::{ConnectionHandle, Presence, ServerEvent};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ClientEvent {
    Register { user_id: String, user_type: Role },
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn presence_ws(
    State(presence): State<Presence>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve_connection(presence, stream))
}

async fn serve_connection(presence: Presence, stream: WebSocket) {
    let (handle, mut rx) = ConnectionHandle::new();
    let (mut sender, mut receiver) = stream.split();
    debug!(connection = %handle.id(), "socket connected");

    let mut push_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!("could not encode {event:?}: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut push_task => break,
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else { break };
                let text = match frame {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let Ok(event) = serde_json::from_str::<ClientEvent>(text.as_str()) else {
                    debug!(connection = %handle.id(), "ignoring unrecognised frame");
                    continue;
                };

                match event {
                    ClientEvent::Register { user_id, user_type } => {
                        presence.register(user_id.clone(), user_type, handle.clone());
                        handle.send(ServerEvent::Registered { user_id, role: user_type });
                    }
                }
            }
        }
    }

    presence.unregister(handle.id());
    push_task.abort();
    debug!(connection = %handle.id(), "socket disconnected");
}

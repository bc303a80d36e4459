//! Presence registry: which user currently holds a live socket.
//!
//! One entry per user ID; registering again replaces the previous connection.
//! Pushes are best effort. A user without an entry simply gets nothing.

mod ws;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use axum::{routing::get, Router};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::{Booking, Food},
    store::Role,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws::presence_ws))
}

/// Events pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Registered { user_id: String, role: Role },
    FoodBooked { booking: Booking, food: Food },
    BookingUpdated { booking: Booking },
}

/// Sending half of one live connection. Equal when it is the same connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: Uuid::now_v7(), tx }, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// False once the connection has gone away.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

#[derive(Debug, Clone)]
struct PresenceEntry {
    handle: ConnectionHandle,
    role: Role,
}

#[derive(Clone, Default)]
pub struct Presence {
    entries: Arc<Mutex<HashMap<String, PresenceEntry>>>,
}

impl Presence {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, PresenceEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maps `user_id` to `handle`, returning the connection it displaced.
    pub fn register(&self, user_id: String, role: Role, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        info!(%user_id, %role, connection = %handle.id, "presence registered");
        self.entries()
            .insert(user_id, PresenceEntry { handle, role })
            .map(|previous| previous.handle)
    }

    /// Drops every entry held by `connection` and returns the affected users.
    pub fn unregister(&self, connection: Uuid) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries().retain(|user_id, entry| {
            if entry.handle.id == connection {
                removed.push(user_id.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            info!(%connection, users = ?removed, "presence unregistered");
        }
        removed
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.entries().get(user_id).map(|entry| entry.handle.clone())
    }

    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        self.entries().get(user_id).map(|entry| entry.role)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Pushes `event` to `user_id` if online. Returns whether it was handed off.
    pub fn notify(&self, user_id: &str, event: ServerEvent) -> bool {
        let Some(handle) = self.lookup(user_id) else {
            debug!(%user_id, "not connected, push dropped");
            return false;
        };
        let delivered = handle.send(event);
        if !delivered {
            debug!(%user_id, "connection closed, push dropped");
        }
        delivered
    }
}

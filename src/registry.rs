//! Room registry — creation, lookup, membership, and reclamation.
//!
//! DESIGN
//! ======
//! One `RwLock` guards both the room map and the connection index, so every
//! mutating registry call is serialized. Rooms themselves live behind their
//! own `Mutex`, letting traffic in different rooms proceed concurrently; lock
//! order is always registry before room.
//!
//! LIFECYCLE
//! =========
//! Rooms are created lazily on first join. When the last member leaves, a
//! destruction task is scheduled after the grace window. The task re-reads
//! the member count when it fires instead of being canceled eagerly, which
//! absorbs a leave/rejoin race inside the window: a repopulated room is
//! simply left alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::history::Operation;
use crate::protocol::ServerEvent;
use crate::state::{Room, RoomMember};

// =============================================================================
// TYPES
// =============================================================================

/// What a joining client needs to reconstruct the room exactly: the visible
/// history and current presence.
#[derive(Debug)]
pub struct JoinSnapshot {
    pub operations: Vec<Operation>,
    pub members: Vec<RoomMember>,
}

/// Result of removing a connection from its room.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub room_id: String,
    pub remaining: Vec<RoomMember>,
}

/// Read-only counters for the stats endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_rooms: usize,
    pub total_users: usize,
    pub rooms: Vec<RoomStats>,
}

#[derive(Debug, Serialize)]
pub struct RoomStats {
    pub id: String,
    /// Current member count.
    pub users: usize,
    /// Stored operations, redo tail included.
    pub operations: usize,
}

// =============================================================================
// REGISTRY
// =============================================================================

struct RegistryInner {
    rooms: HashMap<String, Arc<Mutex<Room>>>,
    /// Connection id -> room id; a connection occupies at most one room.
    connections: HashMap<Uuid, String>,
}

#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    grace: Duration,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner {
                rooms: HashMap::new(),
                connections: HashMap::new(),
            })),
            grace,
        }
    }

    /// Join a room, creating it lazily. Registers the member and its outbound
    /// sender and records the connection mapping. Returns the snapshot the
    /// joining client renders from.
    ///
    /// Dispatch performs an explicit leave before a room switch; if a stale
    /// mapping still exists it is cleaned up here so a connection can never
    /// hold membership in two rooms.
    pub async fn join_or_create(
        &self,
        room_id: &str,
        connection_id: Uuid,
        member: RoomMember,
        tx: mpsc::Sender<ServerEvent>,
    ) -> JoinSnapshot {
        let (room, stale) = {
            let mut inner = self.inner.write().await;
            let previous = inner.connections.insert(connection_id, room_id.to_owned());
            let stale = match previous {
                Some(prev) if prev != room_id => inner.rooms.get(&prev).cloned(),
                _ => None,
            };
            let room = inner
                .rooms
                .entry(room_id.to_owned())
                .or_insert_with(|| {
                    info!(%room_id, "created room");
                    Arc::new(Mutex::new(Room::new(room_id)))
                })
                .clone();
            (room, stale)
        };

        if let Some(stale_room) = stale {
            let mut stale_room = stale_room.lock().await;
            warn!(%connection_id, room_id = %stale_room.room_id, "evicting stale membership on join");
            stale_room.clients.remove(&connection_id);
            stale_room.members.remove(&connection_id);
            stale_room.strokes.discard(connection_id);
        }

        let mut room = room.lock().await;
        room.clients.insert(connection_id, tx);
        room.members.insert(connection_id, member);
        info!(%room_id, %connection_id, members = room.members.len(), "member joined room");

        JoinSnapshot {
            operations: room.history.visible_operations().to_vec(),
            members: room.member_list(),
        }
    }

    /// Remove a connection from its room. `None` for connections that are
    /// not in any room — handlers treat that as "ignore the event".
    ///
    /// Drops the member's open stroke so a half-finished gesture cannot be
    /// committed later, and schedules destruction when the room empties.
    pub async fn leave(&self, connection_id: Uuid) -> Option<LeaveOutcome> {
        let (room_id, room) = {
            let mut inner = self.inner.write().await;
            let room_id = inner.connections.remove(&connection_id)?;
            let room = inner.rooms.get(&room_id)?.clone();
            (room_id, room)
        };

        let remaining = {
            let mut room = room.lock().await;
            room.clients.remove(&connection_id);
            room.members.remove(&connection_id);
            room.strokes.discard(connection_id);
            info!(%room_id, %connection_id, remaining = room.members.len(), "member left room");
            room.member_list()
        };

        if remaining.is_empty() {
            self.schedule_destruction(room_id.clone());
        }

        Some(LeaveOutcome { room_id, remaining })
    }

    /// The room a connection currently occupies. `None` means the event that
    /// prompted the lookup should be dropped, not that something failed.
    pub async fn room_of(&self, connection_id: Uuid) -> Option<Arc<Mutex<Room>>> {
        let inner = self.inner.read().await;
        let room_id = inner.connections.get(&connection_id)?;
        inner.rooms.get(room_id).cloned()
    }

    /// Direct lookup by id, used for post-leave presence broadcasts.
    pub async fn room_by_id(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.inner.read().await.rooms.get(room_id).cloned()
    }

    /// Room/member/operation counters. Read-only, rooms sorted by id.
    pub async fn stats(&self) -> RegistryStats {
        let inner = self.inner.read().await;
        let mut rooms = Vec::with_capacity(inner.rooms.len());
        for (id, room) in &inner.rooms {
            let room = room.lock().await;
            rooms.push(RoomStats {
                id: id.clone(),
                users: room.members.len(),
                operations: room.history.len(),
            });
        }
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        RegistryStats {
            total_rooms: inner.rooms.len(),
            total_users: inner.connections.len(),
            rooms,
        }
    }

    fn schedule_destruction(&self, room_id: String) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(registry.grace).await;
            registry.destroy_if_empty(&room_id).await;
        });
    }

    /// Destruction check at grace expiry: the member count is re-read now,
    /// so a room repopulated during the window survives.
    async fn destroy_if_empty(&self, room_id: &str) {
        let mut inner = self.inner.write().await;
        let Some(room) = inner.rooms.get(room_id) else {
            return;
        };
        if room.lock().await.members.is_empty() {
            inner.rooms.remove(room_id);
            info!(%room_id, "destroyed empty room");
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

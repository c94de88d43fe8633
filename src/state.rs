//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the room registry and the color palette. Each live room owns its
//! operation history, its stroke assembler, its member-presence table, and
//! the outbound senders of its connected clients.
//!
//! All state is in memory only; a room dies with the process (and earlier,
//! once it has been empty past the grace window).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::history::RoomHistory;
use crate::palette::ColorPalette;
use crate::protocol::{Point, ServerEvent};
use crate::registry::RoomRegistry;
use crate::stroke::StrokeAssembler;

// =============================================================================
// ROOM MEMBER
// =============================================================================

/// Presence record for one connection in one room. Serialized as-is into
/// `init-canvas` and `user-left` payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    /// Connection id doubling as the member's public identity.
    pub id: Uuid,
    pub name: String,
    /// Display color from the rotating palette.
    pub color: String,
    pub cursor_position: Option<Point>,
    /// Milliseconds since Unix epoch.
    pub joined_at: i64,
}

// =============================================================================
// ROOM
// =============================================================================

/// Per-room live state. Mutated only under the room's lock, in arrival order
/// of the triggering messages; cross-room traffic never contends.
pub struct Room {
    pub room_id: String,
    pub history: RoomHistory,
    pub strokes: StrokeAssembler,
    /// Presence keyed by connection id.
    pub members: HashMap<Uuid, RoomMember>,
    /// Connected clients: connection id -> sender for outbound events.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerEvent>>,
}

impl Room {
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            history: RoomHistory::new(),
            strokes: StrokeAssembler::new(),
            members: HashMap::new(),
            clients: HashMap::new(),
        }
    }

    /// Fan an event out to every connected client, optionally excluding one.
    /// Called under the room lock so broadcast order matches mutation order.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<Uuid>) {
        for (connection_id, tx) in &self.clients {
            if exclude == Some(*connection_id) {
                continue;
            }
            // Best-effort: if a client's channel is full, skip it.
            let _ = tx.try_send(event.clone());
        }
    }

    /// Members ordered by join time (connection id breaks ties) for stable
    /// snapshot payloads.
    #[must_use]
    pub fn member_list(&self) -> Vec<RoomMember> {
        let mut members: Vec<RoomMember> = self.members.values().cloned().collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        members
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub registry: RoomRegistry,
    pub palette: ColorPalette,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: RoomRegistry::new(config.room_grace),
            palette: ColorPalette::starting_at(config.palette_start),
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::time::Duration;

    use super::*;
    use crate::history::{Operation, OperationKind, now_ms};
    use crate::protocol::Tool;

    /// Create a test `AppState` with default configuration.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with_grace(Duration::from_secs(60))
    }

    /// Create a test `AppState` with an explicit room grace window.
    #[must_use]
    pub fn test_app_state_with_grace(room_grace: Duration) -> AppState {
        let config = ServerConfig { room_grace, client_buffer: 32, ..ServerConfig::default() };
        AppState::new(config)
    }

    /// Create a committed stroke operation for history tests.
    #[must_use]
    pub fn stroke_operation(author_id: Uuid, points: &[(f64, f64)]) -> Operation {
        Operation {
            id: Uuid::new_v4(),
            kind: OperationKind::Stroke,
            author_id,
            points: points.iter().map(|&(x, y)| Point { x, y }).collect(),
            color: "#FF6B6B".into(),
            stroke_width: 4.0,
            tool: Tool::Brush,
            committed_at: now_ms(),
        }
    }

    /// Create a member record for presence tests.
    #[must_use]
    pub fn member(id: Uuid, name: &str, joined_at: i64) -> RoomMember {
        RoomMember {
            id,
            name: name.into(),
            color: "#4ECDC4".into(),
            cursor_position: None,
            joined_at,
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

//! Wire protocol — typed client/server events.
//!
//! DESIGN
//! ======
//! Every websocket message is one JSON object tagged by `type` (kebab-case
//! event names, camelCase fields). Inbound text either deserializes into a
//! [`ClientEvent`] or is rejected at the boundary — the core never sees a
//! malformed event. Outbound state changes are [`ServerEvent`] values, cloned
//! per recipient and serialized at the socket.
//!
//! One enum variant per event kind, one handler per variant in the dispatch
//! layer. Delivery to a room is ordered per client by its FIFO channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::Operation;
use crate::state::RoomMember;

// =============================================================================
// SHARED TYPES
// =============================================================================

/// A 2-D canvas coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Drawing tool carried verbatim on strokes; the server never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Brush,
    Eraser,
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Inbound events. Anything that fails to parse into one of these is dropped
/// at the boundary with a warning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join (or switch to) a room. Both fields are optional; the server
    /// substitutes the default room and a generated display name.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default)]
        room_id: Option<String>,
        #[serde(default)]
        user_name: Option<String>,
    },
    /// A stroke fragment. `is_complete` absent means the fragment ends the
    /// stroke; only an explicit `false` keeps it open.
    #[serde(rename_all = "camelCase")]
    Draw {
        points: Vec<Point>,
        color: String,
        size: f64,
        tool: Tool,
        #[serde(default)]
        is_complete: Option<bool>,
    },
    /// Explicit end-of-gesture signal. Backup for a missing `is_complete`;
    /// harmless duplicate after one (commit is idempotent).
    StrokeComplete,
    #[serde(rename_all = "camelCase")]
    CursorMove { position: Point },
    Undo,
    Redo,
    ClearCanvas,
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::Draw { .. } => "draw",
            Self::StrokeComplete => "stroke-complete",
            Self::CursorMove { .. } => "cursor-move",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::ClearCanvas => "clear-canvas",
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Outbound events. `InitCanvas` goes to the joining connection only; the
/// rest fan out per the dispatch rules in `routes::ws`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Snapshot for a joining connection: everything it must render to match
    /// the room, plus its own identity and assigned color.
    #[serde(rename_all = "camelCase")]
    InitCanvas {
        operations: Vec<Operation>,
        users: Vec<RoomMember>,
        your_id: Uuid,
        your_color: String,
    },
    /// A peer's stroke fragment, relayed as-is for incremental rendering.
    #[serde(rename_all = "camelCase")]
    Draw {
        user_id: Uuid,
        points: Vec<Point>,
        color: String,
        size: f64,
        tool: Tool,
    },
    #[serde(rename_all = "camelCase")]
    Undo { new_index: i64 },
    #[serde(rename_all = "camelCase")]
    Redo { new_index: i64 },
    ClearCanvas,
    #[serde(rename_all = "camelCase")]
    UserJoined { id: Uuid, name: String, color: String },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        user_id: Uuid,
        remaining_users: Vec<RoomMember>,
    },
    #[serde(rename_all = "camelCase")]
    CursorMove { user_id: Uuid, position: Point },
}

// =============================================================================
// TESTS
// =============================================================================

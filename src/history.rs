//! Per-room operation history and the undo/redo cursor.
//!
//! DESIGN
//! ======
//! The history is the single source of truth for a room's canvas: an ordered
//! list of committed operations plus a cursor. Everything at or below the
//! cursor is visible; everything above it is redo-able. Appending after an
//! undo discards the redo tail, standard editor semantics.
//!
//! The struct is not synchronized — the owning `Room` is always mutated under
//! its lock, in arrival order of the triggering messages.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::{Point, Tool};

/// Current time as milliseconds since Unix epoch.
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// OPERATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A committed stroke. The only kind ever stored in history.
    Stroke,
    /// A full canvas reset. Modeled for wire uniformity; resets history
    /// instead of appending.
    Clear,
}

/// One immutable committed drawing action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    pub kind: OperationKind,
    /// Connection that produced the operation.
    pub author_id: Uuid,
    pub points: Vec<Point>,
    pub color: String,
    pub stroke_width: f64,
    pub tool: Tool,
    /// Diagnostics and tie-breaking only; ordering is append order.
    pub committed_at: i64,
}

// =============================================================================
// ROOM HISTORY
// =============================================================================

/// Ordered operation sequence plus cursor. Invariant: `-1 <= cursor < len`.
#[derive(Debug)]
pub struct RoomHistory {
    operations: Vec<Operation>,
    cursor: i64,
}

impl Default for RoomHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomHistory {
    #[must_use]
    pub fn new() -> Self {
        Self { operations: Vec::new(), cursor: -1 }
    }

    /// Append a committed operation, discarding any redo tail first.
    /// Returns the stored operation.
    pub fn append(&mut self, operation: Operation) -> &Operation {
        let visible_len = usize::try_from(self.cursor + 1).unwrap_or(0);
        self.operations.truncate(visible_len);
        self.operations.push(operation);
        self.cursor += 1;
        &self.operations[visible_len]
    }

    /// Step the cursor back. `None` when there is nothing to undo — an
    /// expected race, not an error.
    pub fn undo(&mut self) -> Option<i64> {
        if self.cursor < 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.cursor)
    }

    /// Step the cursor forward over a retained operation. `None` at the head.
    pub fn redo(&mut self) -> Option<i64> {
        let last = i64::try_from(self.operations.len()).unwrap_or(i64::MAX) - 1;
        if self.cursor >= last {
            return None;
        }
        self.cursor += 1;
        Some(self.cursor)
    }

    /// Hard reset: empty history, cursor at -1. Not undoable.
    pub fn clear(&mut self) {
        self.operations.clear();
        self.cursor = -1;
    }

    /// The canonical render state: `operations[0..=cursor]`.
    #[must_use]
    pub fn visible_operations(&self) -> &[Operation] {
        let end = usize::try_from(self.cursor + 1).unwrap_or(0);
        &self.operations[..end]
    }

    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Total stored operations, redo tail included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

//! Stroke assembly — turns fragment bursts into committed operations.
//!
//! DESIGN
//! ======
//! Clients stream small point batches while the pointer drags; only the first
//! fragment's color/size/tool seed the stroke, later fragments just extend the
//! point sequence. Commit produces exactly one `Operation` per gesture and is
//! idempotent, which absorbs the race between the `isComplete` flag and the
//! explicit `stroke-complete` event firing for the same gesture.
//!
//! One assembler per room, keyed by connection; mutated only under the room
//! lock.

use std::collections::HashMap;

use uuid::Uuid;

use crate::history::{Operation, OperationKind, now_ms};
use crate::protocol::{Point, Tool};

/// One inbound `draw` payload: a point batch plus the stroke's rendering
/// parameters (repeated on every fragment, used from the first).
#[derive(Debug, Clone)]
pub struct Fragment {
    pub points: Vec<Point>,
    pub color: String,
    pub size: f64,
    pub tool: Tool,
}

/// An in-progress gesture for one connection.
#[derive(Debug)]
struct OpenStroke {
    points: Vec<Point>,
    color: String,
    size: f64,
    tool: Tool,
}

/// Per-connection open-stroke buffers for one room.
#[derive(Debug, Default)]
pub struct StrokeAssembler {
    open: HashMap<Uuid, OpenStroke>,
}

impl StrokeAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self { open: HashMap::new() }
    }

    /// Open a stroke seeded from the fragment, or extend the one already open
    /// for this connection. The caller re-broadcasts the fragment's points
    /// verbatim so peers render without waiting for commit.
    pub fn begin_or_continue(&mut self, connection_id: Uuid, fragment: Fragment) {
        match self.open.get_mut(&connection_id) {
            Some(stroke) => stroke.points.extend(fragment.points),
            None => {
                self.open.insert(
                    connection_id,
                    OpenStroke {
                        points: fragment.points,
                        color: fragment.color,
                        size: fragment.size,
                        tool: fragment.tool,
                    },
                );
            }
        }
    }

    /// Finalize the open stroke into an operation, assigning its id and
    /// commit timestamp. `None` when nothing is open — duplicate completion
    /// signals are expected, not an error.
    pub fn commit(&mut self, connection_id: Uuid) -> Option<Operation> {
        let stroke = self.open.remove(&connection_id)?;
        Some(Operation {
            id: Uuid::new_v4(),
            kind: OperationKind::Stroke,
            author_id: connection_id,
            points: stroke.points,
            color: stroke.color,
            stroke_width: stroke.size,
            tool: stroke.tool,
            committed_at: now_ms(),
        })
    }

    /// Drop any open stroke without emitting an operation. Used on
    /// disconnect and leave, so a half-finished stroke can never be appended
    /// later.
    pub fn discard(&mut self, connection_id: Uuid) {
        self.open.remove(&connection_id);
    }

    /// Drop every open stroke in the room. Used on clear-canvas.
    pub fn discard_all(&mut self) {
        self.open.clear();
    }

    #[must_use]
    pub fn has_open(&self, connection_id: Uuid) -> bool {
        self.open.contains_key(&connection_id)
    }
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;

//! WebSocket handler — the connection-event dispatcher.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID and enters a `select!` loop:
//! - Incoming client events → parse + dispatch by event kind
//! - Broadcast events from room peers → forward to this client
//!
//! Handler functions are pure business logic — they mutate the locked room
//! and return an `Outcome`. The dispatch layer owns all outbound concerns,
//! applying the outcome while the room lock is still held so every client
//! observes mutations in the order they were applied.
//!
//! Join is the one registry-level exception: it composes its own snapshot
//! reply and presence broadcast, mirroring the leave path.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → connection is Connected, not yet in any room
//! 2. First `join-room` assigns a palette color and enters a room (InRoom)
//! 3. Draw/undo/redo/clear/cursor events dispatch against the current room;
//!    the same events from a room-less connection are expected races and are
//!    dropped silently
//! 4. Close → open stroke discarded, membership removed, `user-left` to the
//!    former room

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::history::now_ms;
use crate::protocol::{ClientEvent, Point, ServerEvent, Tool};
use crate::registry::LeaveOutcome;
use crate::state::{AppState, Room, RoomMember};
use crate::stroke::Fragment;

/// Room id used when the joiner does not name one.
const DEFAULT_ROOM: &str = "default";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by in-room handlers. The dispatch layer uses this to
/// decide who receives what — handlers never send events directly.
enum Outcome {
    /// Fan out to ALL room clients including the sender. Undo/redo/clear
    /// results are one logical shared state every client re-renders.
    Broadcast(ServerEvent),
    /// Fan out to room peers EXCLUDING the sender. Used for draw fragments
    /// and cursor moves, which the sender already rendered locally.
    BroadcastExcludeSender(ServerEvent),
    /// Nothing to send: a no-op race (undo on empty history) or an event
    /// whose effect is not echoed (stroke completion).
    Silent,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for events broadcast by room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.config.client_buffer);

    info!(%connection_id, "ws: client connected");

    // Which room this connection has joined, and its color once assigned.
    let mut current_room: Option<String> = None;
    let mut assigned_color: Option<String> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(
                            &state,
                            &mut current_room,
                            &mut assigned_color,
                            connection_id,
                            &client_tx,
                            &text,
                        )
                        .await;
                        for event in replies {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Membership teardown broadcasts user-left to the remaining members.
    if let Some(outcome) = state.registry.leave(connection_id).await {
        notify_user_left(&state, connection_id, &outcome).await;
    }
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Parse one inbound text message, dispatch to its handler, apply the
/// outcome. Returns events for the sender (the join snapshot); everything
/// else reaches clients through their room channels.
///
/// Split from the socket loop so tests can exercise dispatch and fan-out
/// end-to-end without a live websocket.
async fn process_inbound_text(
    state: &AppState,
    current_room: &mut Option<String>,
    assigned_color: &mut Option<String>,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            // Malformed input stops at the boundary; the core only sees
            // well-formed events.
            warn!(%connection_id, error = %e, "ws: malformed client event dropped");
            return Vec::new();
        }
    };

    match event {
        ClientEvent::JoinRoom { room_id, user_name } => {
            handle_join(
                state,
                current_room,
                assigned_color,
                connection_id,
                client_tx,
                room_id,
                user_name,
            )
            .await
        }
        event => {
            let Some(room) = state.registry.room_of(connection_id).await else {
                // Expected race between network timing and user action, e.g.
                // a draw arriving after leave. Not an error.
                debug!(%connection_id, event = event.label(), "ws: event from room-less connection dropped");
                return Vec::new();
            };
            let mut room = room.lock().await;
            let outcome = dispatch_in_room(&mut room, connection_id, event);
            apply_outcome(&room, connection_id, outcome);
            Vec::new()
        }
    }
}

/// One handler per event kind. Runs under the room lock.
fn dispatch_in_room(room: &mut Room, connection_id: Uuid, event: ClientEvent) -> Outcome {
    match event {
        ClientEvent::Draw { points, color, size, tool, is_complete } => {
            handle_draw(room, connection_id, points, color, size, tool, is_complete)
        }
        ClientEvent::StrokeComplete => handle_stroke_complete(room, connection_id),
        ClientEvent::CursorMove { position } => handle_cursor_move(room, connection_id, position),
        ClientEvent::Undo => handle_undo(room),
        ClientEvent::Redo => handle_redo(room),
        ClientEvent::ClearCanvas => handle_clear(room),
        // Handled on the registry path before room dispatch.
        ClientEvent::JoinRoom { .. } => Outcome::Silent,
    }
}

/// Execute an outcome's fan-out while the room lock is still held.
fn apply_outcome(room: &Room, connection_id: Uuid, outcome: Outcome) {
    match outcome {
        Outcome::Broadcast(event) => room.broadcast(&event, None),
        Outcome::BroadcastExcludeSender(event) => room.broadcast(&event, Some(connection_id)),
        Outcome::Silent => {}
    }
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

async fn handle_join(
    state: &AppState,
    current_room: &mut Option<String>,
    assigned_color: &mut Option<String>,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    room_id: Option<String>,
    user_name: Option<String>,
) -> Vec<ServerEvent> {
    let room_id = room_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_ROOM.to_owned());
    let name = user_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_user_name(connection_id));

    // One room per connection: switching rooms leaves the old one first,
    // presence broadcast included.
    if current_room.take().is_some() {
        if let Some(outcome) = state.registry.leave(connection_id).await {
            notify_user_left(state, connection_id, &outcome).await;
        }
    }

    // The color rotation assigns once per connection; rejoining keeps it.
    let color = assigned_color
        .get_or_insert_with(|| state.palette.assign().to_owned())
        .clone();

    let member = RoomMember {
        id: connection_id,
        name: name.clone(),
        color: color.clone(),
        cursor_position: None,
        joined_at: now_ms(),
    };

    let snapshot = state
        .registry
        .join_or_create(&room_id, connection_id, member, client_tx.clone())
        .await;
    *current_room = Some(room_id.clone());

    if let Some(room) = state.registry.room_by_id(&room_id).await {
        let joined = ServerEvent::UserJoined { id: connection_id, name, color: color.clone() };
        room.lock().await.broadcast(&joined, Some(connection_id));
    }

    vec![ServerEvent::InitCanvas {
        operations: snapshot.operations,
        users: snapshot.members,
        your_id: connection_id,
        your_color: color,
    }]
}

async fn notify_user_left(state: &AppState, connection_id: Uuid, outcome: &LeaveOutcome) {
    let Some(room) = state.registry.room_by_id(&outcome.room_id).await else {
        return;
    };
    let event = ServerEvent::UserLeft {
        user_id: connection_id,
        remaining_users: outcome.remaining.clone(),
    };
    room.lock().await.broadcast(&event, None);
}

// =============================================================================
// IN-ROOM HANDLERS
// =============================================================================

fn handle_draw(
    room: &mut Room,
    connection_id: Uuid,
    points: Vec<Point>,
    color: String,
    size: f64,
    tool: Tool,
    is_complete: Option<bool>,
) -> Outcome {
    let fragment_points = points.clone();
    room.strokes.begin_or_continue(
        connection_id,
        Fragment { points, color: color.clone(), size, tool },
    );

    // A missing flag means the fragment closes the stroke; only an explicit
    // `false` keeps the gesture open.
    if is_complete.unwrap_or(true) {
        if let Some(operation) = room.strokes.commit(connection_id) {
            debug!(
                room_id = %room.room_id,
                %connection_id,
                points = operation.points.len(),
                "stroke committed"
            );
            room.history.append(operation);
        }
    }

    // Peers render the new points immediately; the sender already has them,
    // and the finalized operation is never re-sent.
    Outcome::BroadcastExcludeSender(ServerEvent::Draw {
        user_id: connection_id,
        points: fragment_points,
        color,
        size,
        tool,
    })
}

fn handle_stroke_complete(room: &mut Room, connection_id: Uuid) -> Outcome {
    // Backup completion signal; commit is idempotent so a duplicate after an
    // `isComplete` fragment falls through to nothing.
    if let Some(operation) = room.strokes.commit(connection_id) {
        debug!(
            room_id = %room.room_id,
            %connection_id,
            points = operation.points.len(),
            "stroke committed via completion signal"
        );
        room.history.append(operation);
    }
    Outcome::Silent
}

fn handle_cursor_move(room: &mut Room, connection_id: Uuid, position: Point) -> Outcome {
    let Some(member) = room.members.get_mut(&connection_id) else {
        return Outcome::Silent;
    };
    member.cursor_position = Some(position);
    Outcome::BroadcastExcludeSender(ServerEvent::CursorMove { user_id: connection_id, position })
}

fn handle_undo(room: &mut Room) -> Outcome {
    match room.history.undo() {
        Some(new_index) => {
            info!(room_id = %room.room_id, new_index, "undo");
            Outcome::Broadcast(ServerEvent::Undo { new_index })
        }
        None => Outcome::Silent,
    }
}

fn handle_redo(room: &mut Room) -> Outcome {
    match room.history.redo() {
        Some(new_index) => {
            info!(room_id = %room.room_id, new_index, "redo");
            Outcome::Broadcast(ServerEvent::Redo { new_index })
        }
        None => Outcome::Silent,
    }
}

fn handle_clear(room: &mut Room) -> Outcome {
    room.history.clear();
    // Half-drawn strokes from any member must not commit after the reset.
    room.strokes.discard_all();
    info!(room_id = %room.room_id, "canvas cleared");
    Outcome::Broadcast(ServerEvent::ClearCanvas)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Display name for joiners that did not supply one.
fn default_user_name(connection_id: Uuid) -> String {
    let hex = connection_id.simple().to_string();
    format!("User{}", &hex[..4])
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

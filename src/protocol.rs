//! Wire types for the Caro game server's named-event protocol.
//!
//! Every message is one JSON text frame of the shape
//! `{"type": "<event name>", "data": {…}}`. Event names are `snake_case`
//! and payload field spelling follows the server exactly (note the
//! camelCase `roomId` inside `join_room`).
//!
//! The server emits many more event names than this client consumes
//! (`room_update`, `game_start`, `move_made`, …). Everything the client
//! does not model deserializes to [`ServerMessage::Unknown`] and is
//! dropped — an explicit forward-compatibility default, not an error.

use serde::{Deserialize, Serialize};

/// Message types sent from client to server.
///
/// One variant per operator-visible action plus the heartbeat. Unit
/// variants serialize without a `data` field; the server treats a missing
/// payload and an empty payload the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room (MUST be the first message after the handshake).
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
        password: String,
    },
    /// Heartbeat proving liveness; the server answers with `pong`.
    Ping,
    /// Place a stone at board coordinates `(x, y)`.
    PlayerMove { x: i32, y: i32 },
    /// Signal readiness in the room lobby.
    PlayerReady,
    /// Ask the server to start the game (room owner only).
    ForceStart,
    /// Offer a draw to the opponent.
    RequestDraw,
    /// Accept the opponent's draw offer.
    AcceptDraw,
    /// Ask the opponent to allow undoing the last move.
    RequestUndo,
    /// Accept the opponent's undo request.
    AcceptUndo,
    /// Concede the game.
    Resign,
    /// Leave the current room.
    LeaveRoom,
}

/// Message types received from the server.
///
/// Only `pong` is consumed by this client. Every other event name lands
/// in [`Unknown`](ServerMessage::Unknown) via `#[serde(other)]` and is
/// ignored by the transport loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Heartbeat acknowledgment. The payload is server-defined and is
    /// surfaced to the operator verbatim.
    Pong(serde_json::Value),
    /// Any event name this client does not handle.
    #[serde(other)]
    Unknown,
}

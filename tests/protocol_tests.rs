#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests: every outbound event serializes to the exact JSON
//! the server expects, and inbound frames map to the right variants.

use caro_client::protocol::{ClientMessage, ServerMessage};
use serde_json::json;

fn wire(msg: &ClientMessage) -> serde_json::Value {
    serde_json::to_value(msg).expect("serialize")
}

// ── Outbound event names and payloads ───────────────────────────────

#[test]
fn join_room_wire_format_uses_camel_case_room_id() {
    let msg = ClientMessage::JoinRoom {
        room_id: "692beee74613f85f9e49513c".into(),
        password: "123".into(),
    };
    assert_eq!(
        wire(&msg),
        json!({
            "type": "join_room",
            "data": { "roomId": "692beee74613f85f9e49513c", "password": "123" },
        })
    );
}

#[test]
fn player_move_wire_format() {
    let msg = ClientMessage::PlayerMove { x: 3, y: 4 };
    assert_eq!(
        wire(&msg),
        json!({ "type": "player_move", "data": { "x": 3, "y": 4 } })
    );
}

#[test]
fn zero_payload_events_carry_only_their_name() {
    let cases = [
        (ClientMessage::Ping, "ping"),
        (ClientMessage::PlayerReady, "player_ready"),
        (ClientMessage::ForceStart, "force_start"),
        (ClientMessage::RequestDraw, "request_draw"),
        (ClientMessage::AcceptDraw, "accept_draw"),
        (ClientMessage::RequestUndo, "request_undo"),
        (ClientMessage::AcceptUndo, "accept_undo"),
        (ClientMessage::Resign, "resign"),
        (ClientMessage::LeaveRoom, "leave_room"),
    ];
    for (msg, name) in cases {
        assert_eq!(wire(&msg), json!({ "type": name }), "event {name}");
    }
}

#[test]
fn client_message_round_trips() {
    let originals = vec![
        ClientMessage::JoinRoom {
            room_id: "r".into(),
            password: String::new(),
        },
        ClientMessage::Ping,
        ClientMessage::PlayerMove { x: -2, y: 19 },
        ClientMessage::PlayerReady,
        ClientMessage::LeaveRoom,
    ];
    for original in originals {
        let text = serde_json::to_string(&original).expect("serialize");
        let back: ClientMessage = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, original);
    }
}

// ── Inbound frames ──────────────────────────────────────────────────

#[test]
fn pong_frame_parses_with_payload() {
    let text = json!({ "type": "pong", "data": { "time": 1764486677 } }).to_string();
    let msg: ServerMessage = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(msg, ServerMessage::Pong(json!({ "time": 1764486677 })));
}

#[test]
fn pong_payload_shape_is_opaque() {
    // The payload is server-defined; arrays and scalars must survive.
    let text = json!({ "type": "pong", "data": [1, 2, 3] }).to_string();
    let msg: ServerMessage = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(msg, ServerMessage::Pong(json!([1, 2, 3])));
}

#[test]
fn unhandled_event_names_parse_to_unknown() {
    for name in ["room_update", "game_start", "move_made", "game_end", "draw_requested"] {
        let text = json!({ "type": name, "data": { "whatever": 1 } }).to_string();
        let msg: ServerMessage = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(msg, ServerMessage::Unknown, "event {name}");
    }
}

#[test]
fn unknown_event_without_payload_still_parses() {
    let text = json!({ "type": "room_deleted" }).to_string();
    let msg: ServerMessage = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(msg, ServerMessage::Unknown);
}

#[test]
fn frame_without_type_field_is_an_error() {
    let result = serde_json::from_str::<ServerMessage>(r#"{"data":{}}"#);
    assert!(result.is_err());
}

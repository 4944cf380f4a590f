#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for the connection lifecycle and the command
//! dispatcher driving a live session.

mod common;

use std::time::Duration;

use caro_client::protocol::ClientMessage;
use caro_client::{command, CaroClient, CaroEvent};
use common::{decode_sent, pong_json, test_config, unknown_event_json, MockTransport};

#[tokio::test]
async fn join_room_is_the_first_wire_message() {
    let (transport, sent, _closed) = MockTransport::new(vec![]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    let first = events.recv().await.unwrap();
    assert!(matches!(first, CaroEvent::Connected));

    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = decode_sent(&sent);
    assert_eq!(
        messages.first(),
        Some(&ClientMessage::JoinRoom {
            room_id: "room-1".into(),
            password: "123".into(),
        })
    );

    client.shutdown().await;
}

#[tokio::test]
async fn join_room_precedes_operator_events() {
    let (transport, sent, _closed) = MockTransport::new(vec![]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    // Queue an operator command immediately, before even draining the
    // Connected event — the join must still win.
    client.sender().send(ClientMessage::PlayerReady).unwrap();

    let _ = events.recv().await; // Connected
    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = decode_sent(&sent);
    assert!(matches!(
        messages.first(),
        Some(ClientMessage::JoinRoom { .. })
    ));
    assert_eq!(messages.get(1), Some(&ClientMessage::PlayerReady));

    client.shutdown().await;
}

#[tokio::test]
async fn pong_event_carries_server_payload() {
    let payload = serde_json::json!({ "time": 1764486677123_u64 });
    let (transport, _sent, _closed) =
        MockTransport::new(vec![Some(Ok(pong_json(payload.clone())))]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    let _ = events.recv().await; // Connected
    let event = events.recv().await.unwrap();
    assert_eq!(event, CaroEvent::Pong { payload });

    client.shutdown().await;
}

#[tokio::test]
async fn unhandled_server_events_produce_no_client_events() {
    let (transport, _sent, _closed) = MockTransport::new(vec![
        Some(Ok(unknown_event_json("room_update"))),
        Some(Ok(unknown_event_json("game_start"))),
        Some(Ok(unknown_event_json("move_made"))),
        Some(Ok(pong_json(serde_json::json!({})))),
    ]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    let _ = events.recv().await; // Connected
    // The three unhandled events are dropped; the pong comes straight through.
    let event = events.recv().await.unwrap();
    assert!(matches!(event, CaroEvent::Pong { .. }));

    client.shutdown().await;
}

#[tokio::test]
async fn transport_close_flips_state_and_emits_disconnected() {
    let (transport, _sent, _closed) = MockTransport::new(vec![None]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    let _ = events.recv().await; // Connected
    let event = events.recv().await.unwrap();
    assert!(matches!(event, CaroEvent::Disconnected { reason: None }));
    assert!(!client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_server_json_is_not_fatal() {
    let (transport, _sent, _closed) = MockTransport::new(vec![
        Some(Ok("{not json".to_string())),
        Some(Ok(pong_json(serde_json::json!(null)))),
    ]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    let _ = events.recv().await; // Connected
    let event = events.recv().await.unwrap();
    assert!(matches!(event, CaroEvent::Pong { .. }));

    client.shutdown().await;
}

// ── Dispatcher against a live session ───────────────────────────────

#[tokio::test]
async fn command_sequence_reaches_the_wire_in_order() {
    let (transport, sent, _closed) = MockTransport::new(vec![]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());
    let _ = events.recv().await; // Connected

    let script = b"ready\nmove 3 4\nxyz\nleave\n";
    let sender = client.sender();
    command::run(tokio::io::BufReader::new(&script[..]), &sender)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    // `xyz` is diagnosed and produces no event; everything else lands in
    // input order after the automatic join.
    let messages = decode_sent(&sent);
    assert_eq!(
        messages,
        vec![
            ClientMessage::JoinRoom {
                room_id: "room-1".into(),
                password: "123".into(),
            },
            ClientMessage::PlayerReady,
            ClientMessage::PlayerMove { x: 3, y: 4 },
            ClientMessage::LeaveRoom,
        ]
    );

    client.shutdown().await;
}

#[tokio::test]
async fn bad_move_arguments_emit_nothing() {
    let (transport, sent, _closed) = MockTransport::new(vec![]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());
    let _ = events.recv().await; // Connected

    let script = b"move a b\nmove 1\nmove\n";
    let sender = client.sender();
    command::run(tokio::io::BufReader::new(&script[..]), &sender)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = decode_sent(&sent);
    assert_eq!(messages.len(), 1, "only the join should reach the wire");
    assert!(matches!(messages.first(), Some(ClientMessage::JoinRoom { .. })));

    client.shutdown().await;
}

#[tokio::test]
async fn dispatcher_survives_send_failures_after_disconnect() {
    let (transport, sent, _closed) = MockTransport::new(vec![None]);
    let (mut client, mut events) = CaroClient::start(transport, test_config());

    let _ = events.recv().await; // Connected
    let _ = events.recv().await; // Disconnected

    // Both sends fail with NotConnected; the loop must still consume the
    // whole script and return cleanly at EOF.
    let script = b"ready\nresign\n";
    let sender = client.sender();
    command::run(tokio::io::BufReader::new(&script[..]), &sender)
        .await
        .unwrap();

    // At most the initial join reached the wire (the scripted close can
    // even beat it onto the loop); neither command did.
    let messages = decode_sent(&sent);
    assert!(messages.len() <= 1, "nothing after the join should be sent");

    client.shutdown().await;
}

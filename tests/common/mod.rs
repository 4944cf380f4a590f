#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for the Caro client integration tests.
//!
//! Provides a channel-backed [`MockTransport`] plus helpers for building
//! server JSON frames and decoding what the client put on the wire.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use caro_client::protocol::ClientMessage;
use caro_client::{CaroConfig, CaroError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted transport for integration testing.
///
/// `recv()` yields the scripted items in order (`None` scripts a clean
/// close); once the script runs out it hangs so the transport loop stays
/// alive until shutdown. Everything the client sends is recorded.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, CaroError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock with the given scripted incoming messages, plus
    /// shared handles for inspecting sent messages and the close flag.
    pub fn new(
        incoming: Vec<Option<Result<String, CaroError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), CaroError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, CaroError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), CaroError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

/// A client configuration pointing at the test room.
pub fn test_config() -> CaroConfig {
    CaroConfig::new("ws://localhost:5000", "test-token", "room-1").with_room_password("123")
}

/// JSON frame for a `pong` server event with the given payload.
pub fn pong_json(payload: serde_json::Value) -> String {
    serde_json::json!({ "type": "pong", "data": payload }).to_string()
}

/// JSON frame for a server event this client does not handle.
pub fn unknown_event_json(name: &str) -> String {
    serde_json::json!({ "type": name, "data": { "noise": true } }).to_string()
}

/// Decode the recorded wire messages back into typed client messages.
pub fn decode_sent(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<ClientMessage> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|m| serde_json::from_str(m).expect("sent message should be valid JSON"))
        .collect()
}

//! Async client for the Caro game server connection.
//!
//! [`CaroClient::start`] takes a connected [`Transport`] plus a
//! [`CaroConfig`] and spawns a background transport loop. It returns a
//! handle and a bounded channel of [`CaroEvent`]s. The loop queues
//! `join_room` as the very first outbound message, so the configured room
//! is joined before any operator command can reach the wire.
//!
//! Outbound traffic from every activity — the command dispatcher and the
//! keepalive loop — funnels through one [`CommandSender`], which is the
//! only way to reach the session-owning task. Connection state is a
//! single atomic flag written by the transport loop and read by everyone
//! else.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect(&url, &token).await?;
//! let config = CaroConfig::new(url, token, "room-42");
//! let (client, mut events) = CaroClient::start(transport, config);
//!
//! let sender = client.sender();
//! sender.send(ClientMessage::PlayerReady)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         CaroEvent::Pong { payload } => println!("pong: {payload}"),
//!         CaroEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::{CaroError, Result};
use crate::event::CaroEvent;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::Transport;

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Startup configuration for the client.
///
/// Carries everything the tool previously hardcoded: where to connect,
/// how to authenticate, which room to join, and the heartbeat period.
/// Call [`validate`](CaroConfig::validate) once at startup.
#[derive(Debug, Clone)]
pub struct CaroConfig {
    /// WebSocket URL of the game server.
    pub server_url: String,
    /// Bearer token presented during the transport handshake.
    pub auth_token: String,
    /// Identifier of the room to join right after connecting.
    pub room_id: String,
    /// Password for the room. Empty means no password.
    pub room_password: String,
    /// Period of the keepalive loop. Defaults to **5 seconds**.
    pub heartbeat_interval: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped (with a
    /// warning) rather than blocking the transport loop. The final
    /// `Disconnected` event is always delivered regardless of capacity.
    /// Defaults to **256**; values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`CaroClient::shutdown`] waits for the transport loop to
    /// exit before aborting it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl CaroConfig {
    /// Create a configuration with the given connection parameters and
    /// default tuning values.
    pub fn new(
        server_url: impl Into<String>,
        auth_token: impl Into<String>,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            auth_token: auth_token.into(),
            room_id: room_id.into(),
            room_password: String::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the room password.
    #[must_use]
    pub fn with_room_password(mut self, password: impl Into<String>) -> Self {
        self.room_password = password.into();
        self
    }

    /// Set the keepalive period.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the capacity of the bounded event channel.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the graceful shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CaroError::Config`] naming the first offending field:
    /// empty server URL, auth token, or room id, or a zero heartbeat
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(CaroError::Config("server URL must not be empty".into()));
        }
        if self.auth_token.trim().is_empty() {
            return Err(CaroError::Config("auth token must not be empty".into()));
        }
        if self.room_id.trim().is_empty() {
            return Err(CaroError::Config("room id must not be empty".into()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(CaroError::Config(
                "heartbeat interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// State shared between the client handle, the transport loop, and every
/// [`CommandSender`] clone.
///
/// `connected` is the single source of truth the keepalive loop consults
/// before emitting a heartbeat. It is written only by the transport loop
/// (true at start, false on any termination path).
struct ClientState {
    connected: AtomicBool,
}

impl ClientState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }
}

// ── CommandSender ───────────────────────────────────────────────────

/// Cloneable sender half of the command channel into the transport loop.
///
/// The command dispatcher and the keepalive loop each hold a clone; the
/// transport loop serializes whatever arrives, so concurrent activities
/// never interleave partial writes on the wire.
#[derive(Clone)]
pub struct CommandSender {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    state: Arc<ClientState>,
}

impl CommandSender {
    /// Returns `true` while the transport session is believed to be up.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Queue an outbound event for the transport loop.
    ///
    /// Returns immediately once the message is queued; there is no
    /// round-trip await.
    ///
    /// # Errors
    ///
    /// Returns [`CaroError::NotConnected`] if the session has ended.
    pub fn send(&self, msg: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(CaroError::NotConnected);
        }
        self.cmd_tx
            .send(msg)
            .map_err(|_| CaroError::NotConnected)
    }
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to the running connection.
///
/// Created via [`CaroClient::start`]. Owns the background transport loop
/// task; dropping the handle aborts the task, [`shutdown`](Self::shutdown)
/// ends it gracefully.
pub struct CaroClient {
    sender: CommandSender,
    /// Handle to the background transport loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot to ask the transport loop for a graceful exit.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl CaroClient {
    /// Start the transport loop and return a handle plus event receiver.
    ///
    /// The loop queues a `join_room` message for the configured room
    /// before anything else, then multiplexes outbound commands and
    /// inbound server events until the session ends.
    #[must_use = "the event receiver must be consumed to observe the session"]
    pub fn start(
        transport: impl Transport,
        config: CaroConfig,
    ) -> (Self, mpsc::Receiver<CaroEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        // tokio panics on a zero-capacity bounded channel.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<CaroEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = Arc::new(ClientState::new());

        // Queue the join before spawning so it is the first message the
        // loop ever writes — no operator command can overtake it.
        let join = ClientMessage::JoinRoom {
            room_id: config.room_id,
            password: config.room_password,
        };
        let _ = cmd_tx.send(join);

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&state),
            shutdown_rx,
        ));

        let client = Self {
            sender: CommandSender { cmd_tx, state },
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    /// A cloneable sender for queueing outbound events.
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Returns `true` while the transport session is believed to be up.
    pub fn is_connected(&self) -> bool {
        self.sender.is_connected()
    }

    /// Shut down the client: close the transport and stop the loop.
    ///
    /// The loop gets `shutdown_timeout` to close the transport and emit
    /// the final `Disconnected` event; past that it is aborted. The event
    /// receiver yields `None` once the loop has exited.
    pub async fn shutdown(&mut self) {
        debug!("client shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.sender.state.connected.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for CaroClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaroClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for CaroClient {
    fn drop(&mut self) {
        // `Drop` is synchronous, so a graceful close (which awaits
        // `transport.close()`) is not possible here. Aborting the task
        // drops the transport loop future immediately.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background loop multiplexing outbound commands, the shutdown signal,
/// and inbound server messages via `tokio::select!`.
///
/// Exits when the command channel closes, the shutdown signal fires, the
/// server closes the connection, or a transport error occurs. Every exit
/// path clears the connected flag and delivers a final `Disconnected`.
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<CaroEvent>,
    state: Arc<ClientState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    debug!("transport loop started");

    // The transport was connected before the loop existed; announce it.
    emit_event(&event_tx, CaroEvent::Connected).await;

    loop {
        tokio::select! {
            // Branch 1: outbound event from a CommandSender
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(msg) => {
                        debug!("sending client message: {:?}", std::mem::discriminant(&msg));
                        match serde_json::to_string(&msg) {
                            Ok(json) => {
                                if let Err(e) = transport.send(json).await {
                                    error!("transport send error: {e}");
                                    emit_disconnected(
                                        &event_tx,
                                        &state,
                                        Some(format!("transport send error: {e}")),
                                    ).await;
                                    break;
                                }
                            }
                            Err(e) => {
                                // A message that fails to serialize is a
                                // programming bug; don't kill the session.
                                error!("failed to serialize client message: {e}");
                            }
                        }
                    }
                    // Command channel closed — every sender dropped.
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: inbound message from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(ServerMessage::Pong(payload)) => {
                                emit_event(&event_tx, CaroEvent::Pong { payload }).await;
                            }
                            Ok(ServerMessage::Unknown) => {
                                // Unhandled event names are expected; the
                                // server broadcasts far more than this
                                // tool consumes.
                                debug!("ignoring unhandled server event: {text}");
                            }
                            Err(e) => {
                                warn!("failed to deserialize server message: {e} — raw: {text}");
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &state, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Emit an event, dropping it with a warning if the channel is full so
/// the transport loop never blocks on a slow consumer.
async fn emit_event(event_tx: &mpsc::Sender<CaroEvent>, event: CaroEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Clear the connected flag and deliver the final `Disconnected` event.
///
/// Uses a blocking `send().await` rather than `try_send`: `Disconnected`
/// is the last event on the channel and must never be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<CaroEvent>,
    state: &ClientState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    let event = CaroEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Records sent messages and replays scripted responses.
    struct MockTransport {
        /// Items `recv()` yields in order; `None` scripts a clean close.
        incoming: VecDeque<Option<std::result::Result<String, CaroError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, CaroError>>>,
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
        async fn send(&mut self, message: String) -> std::result::Result<(), CaroError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, CaroError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                // All scripted messages delivered — hang so the loop
                // stays alive until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), CaroError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn test_config() -> CaroConfig {
        CaroConfig::new("ws://localhost:5000", "test-token", "room-1")
            .with_room_password("123")
    }

    fn pong_json() -> String {
        serde_json::json!({ "type": "pong", "data": { "time": 1764486677 } }).to_string()
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_queues_join_room_first() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let event = events.recv().await.unwrap();
        assert!(matches!(event, CaroEvent::Connected));

        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let messages = sent.lock().unwrap();
            assert!(!messages.is_empty());
            let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
            assert_eq!(
                first,
                ClientMessage::JoinRoom {
                    room_id: "room-1".into(),
                    password: "123".into(),
                }
            );
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn connected_is_first_event() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(pong_json()))]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let first = events.recv().await.unwrap();
        assert!(
            matches!(first, CaroEvent::Connected),
            "expected Connected as first event, got {first:?}"
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn pong_payload_is_surfaced() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Ok(pong_json()))]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            CaroEvent::Pong {
                payload: serde_json::json!({ "time": 1764486677 }),
            }
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_server_event_is_ignored() {
        let room_update = serde_json::json!({
            "type": "room_update",
            "data": { "players": [] },
        })
        .to_string();
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(room_update)),
            Some(Ok(pong_json())),
        ]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        // The unknown event produces nothing; the next event is the pong.
        let event = events.recv().await.unwrap();
        assert!(matches!(event, CaroEvent::Pong { .. }));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn sender_queues_messages_in_order() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());
        let _ = events.recv().await; // Connected

        let sender = client.sender();
        sender.send(ClientMessage::PlayerReady).unwrap();
        sender.send(ClientMessage::PlayerMove { x: 3, y: 4 }).unwrap();
        sender.send(ClientMessage::LeaveRoom).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let messages = sent.lock().unwrap();
            let parsed: Vec<ClientMessage> = messages
                .iter()
                .map(|m| serde_json::from_str(m).unwrap())
                .collect();
            assert_eq!(
                parsed,
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
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnected_on_transport_close() {
        let (transport, _sent, _closed) =
            MockTransport::new(vec![Some(Ok(pong_json())), None]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // Pong
        let event = events.recv().await.unwrap();
        assert!(matches!(event, CaroEvent::Disconnected { reason: None }));

        assert!(!client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn transport_recv_error_emits_disconnected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            CaroError::TransportReceive("boom".into()),
        ))]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        let event = events.recv().await.unwrap();
        if let CaroEvent::Disconnected { reason } = event {
            assert!(reason.unwrap().contains("boom"));
        } else {
            panic!("expected Disconnected, got {event:?}");
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn send_fails_after_disconnect() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // Disconnected

        let result = client.sender().send(ClientMessage::Ping);
        assert!(matches!(result, Err(CaroError::NotConnected)));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        client.shutdown().await;

        let result = client.sender().send(ClientMessage::Ping);
        assert!(matches!(result, Err(CaroError::NotConnected)));
    }

    #[tokio::test]
    async fn shutdown_emits_disconnected_and_closes_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        client.shutdown().await;

        let event = events.recv().await.unwrap();
        if let CaroEvent::Disconnected { reason } = event {
            assert_eq!(reason.as_deref(), Some("client shut down"));
        } else {
            panic!("expected Disconnected, got {event:?}");
        }

        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        client.shutdown().await;
        client.shutdown().await;
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (client, mut events) = CaroClient::start(transport, test_config());

        let _ = events.recv().await; // Connected
        drop(client);

        // The loop exits and the channel closes; just verify no hang.
        while let Some(_event) = events.recv().await {}
    }

    /// Transport whose `close()` hangs, for exercising the shutdown
    /// timeout/abort path.
    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl HangingCloseTransport {
        fn new() -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
            let close_called = Arc::new(AtomicBool::new(false));
            let dropped = Arc::new(AtomicBool::new(false));
            (
                Self {
                    close_called: Arc::clone(&close_called),
                    dropped: Arc::clone(&dropped),
                },
                close_called,
                dropped,
            )
        }
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), CaroError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, CaroError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), CaroError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_transport_task() {
        let (transport, close_called, dropped) = HangingCloseTransport::new();
        let config = test_config().with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, mut events) = CaroClient::start(transport, config);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, CaroEvent::Connected));

        client.shutdown().await;

        assert!(
            close_called.load(Ordering::Acquire),
            "transport.close() should have been attempted during graceful shutdown"
        );
        assert!(
            dropped.load(Ordering::Acquire),
            "timed-out shutdown should abort and drop the transport loop task"
        );
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn event_channel_backpressure_does_not_block() {
        // More inbound pongs than the channel can hold, with no reader.
        let mut incoming: Vec<Option<std::result::Result<String, CaroError>>> = Vec::new();
        for _ in 0..20 {
            incoming.push(Some(Ok(pong_json())));
        }
        incoming.push(None);

        let (transport, _sent, _closed) = MockTransport::new(incoming);
        let config = test_config().with_event_channel_capacity(1);
        let (mut client, mut events) = CaroClient::start(transport, config);

        // Let the channel fill and events get dropped.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut count = 0;
        let mut saw_disconnected = false;
        while let Some(event) = events.recv().await {
            if matches!(event, CaroEvent::Disconnected { .. }) {
                saw_disconnected = true;
            }
            count += 1;
        }
        // With capacity 1, some of the 20 pongs must have been dropped,
        // but the final Disconnected is always delivered.
        assert!(count < 22, "expected backpressure to drop events, got {count}");
        assert!(saw_disconnected, "Disconnected must never be dropped");

        client.shutdown().await;
    }

    // ── Config tests ────────────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = CaroConfig::new("ws://h", "tok", "room");
        assert_eq!(config.room_password, "");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_builder_methods() {
        let config = CaroConfig::new("ws://h", "tok", "room")
            .with_room_password("pw")
            .with_heartbeat_interval(Duration::from_secs(2))
            .with_event_channel_capacity(512)
            .with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(config.room_password, "pw");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(config.event_channel_capacity, 512);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_event_channel_capacity_is_clamped_to_one() {
        let config = CaroConfig::new("ws://h", "tok", "room").with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn config_validate_accepts_complete_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn config_validate_rejects_empty_fields() {
        let no_url = CaroConfig::new("", "tok", "room");
        assert!(matches!(no_url.validate(), Err(CaroError::Config(_))));

        let no_token = CaroConfig::new("ws://h", "  ", "room");
        assert!(matches!(no_token.validate(), Err(CaroError::Config(_))));

        let no_room = CaroConfig::new("ws://h", "tok", "");
        assert!(matches!(no_room.validate(), Err(CaroError::Config(_))));
    }

    #[test]
    fn config_validate_rejects_zero_heartbeat() {
        let config = test_config().with_heartbeat_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CaroError::Config(_))));
    }
}

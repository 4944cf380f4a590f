//! Transport abstraction over the connection to the game server.
//!
//! The [`Transport`] trait is the client's only view of the network: a
//! bidirectional channel of complete JSON text messages. Framing is the
//! implementation's concern (WebSocket frames, length-prefixed TCP, an
//! in-process channel pair for tests).
//!
//! Connection setup is deliberately not part of the trait — each backend
//! has its own parameters (URL plus bearer token for WebSocket, channel
//! halves for a loopback). Construct a connected transport first, then
//! hand it to [`CaroClient::start`](crate::client::CaroClient::start).

use async_trait::async_trait;

use crate::error::CaroError;

/// A bidirectional text message channel to the game server.
///
/// Each `send` transmits one complete JSON message; each `recv` yields
/// one complete JSON message.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **must** be cancel-safe: the transport loop
/// polls it inside `tokio::select!`, and a cancelled `recv` must not lose
/// a message. Channel-backed implementations get this for free.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`CaroError::TransportSend`] if the message could not be
    /// written (connection broken, write buffer full).
    async fn send(&mut self, message: String) -> Result<(), CaroError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete message arrived
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the server closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, CaroError>>;

    /// Close the connection gracefully.
    ///
    /// After `close`, further `send`/`recv` calls may fail or yield
    /// `None`. Implementations should release resources even when the
    /// close handshake itself fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails.
    async fn close(&mut self) -> Result<(), CaroError>;
}

//! # Caro Client
//!
//! Interactive test client for a Caro multiplayer game server reachable
//! over a persistent, event-based connection.
//!
//! The crate provides the pieces the console binary wires together:
//!
//! - [`Transport`] — narrow interface to the server: complete JSON text
//!   messages in, complete JSON text messages out
//! - [`WebSocketTransport`] — built-in transport with a bearer-token
//!   handshake (default `transport-websocket` feature)
//! - [`CaroClient`] — owns the session: spawns a background transport
//!   loop, queues `join_room` first, and emits [`CaroEvent`]s
//! - [`Keepalive`](keepalive::Keepalive) — background heartbeat loop,
//!   gated on the shared connection state
//! - [`command`] — operator command grammar and the `> ` prompt loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let config = CaroConfig::new(url, token, room_id).with_room_password("123");
//! config.validate()?;
//!
//! let transport = WebSocketTransport::connect(&config.server_url, &config.auth_token).await?;
//! let (client, mut events) = CaroClient::start(transport, config);
//!
//! let keepalive = Keepalive::spawn(client.sender(), DEFAULT_HEARTBEAT_INTERVAL);
//! while let Some(event) = events.recv().await { /* … */ }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod event;
pub mod keepalive;
pub mod protocol;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{CaroClient, CaroConfig, CommandSender, DEFAULT_HEARTBEAT_INTERVAL};
pub use error::CaroError;
pub use event::CaroEvent;
pub use keepalive::Keepalive;
pub use protocol::{ClientMessage, ServerMessage};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;

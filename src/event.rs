//! Events surfaced by the client to the operator-facing loop.

/// An event emitted on the channel returned by
/// [`CaroClient::start`](crate::client::CaroClient::start).
///
/// `Connected` and `Disconnected` are synthetic transport-lifecycle
/// events; `Pong` carries the server's heartbeat acknowledgment payload.
/// `Disconnected` is always the last event on the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum CaroEvent {
    /// The transport session is up and the join request has been queued.
    Connected,
    /// The transport session ended, gracefully or not.
    Disconnected {
        /// Human-readable cause, if one is known.
        reason: Option<String>,
    },
    /// The server acknowledged a heartbeat.
    Pong {
        /// Server-defined payload, printed verbatim for the operator.
        payload: serde_json::Value,
    },
}

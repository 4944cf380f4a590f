//! Error types for the Caro test client.

use thiserror::Error;

/// Errors that can occur when using the Caro client.
#[derive(Debug, Error)]
pub enum CaroError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a wire message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The startup configuration is invalid or incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized [`Result`] type for Caro client operations.
pub type Result<T> = std::result::Result<T, CaroError>;

//! Error types for redis-info-collector

use std::io;
use thiserror::Error;

/// Top-level collector error
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CollectorError {
    /// Whether the connection that produced this error can still carry
    /// another command.
    ///
    /// Only a reply that was read to its end qualifies: an error reply, or a
    /// well-formed reply of the wrong type. An unknown type byte or a bad
    /// length header leaves unread bytes on the socket.
    pub fn connection_usable(&self) -> bool {
        matches!(
            self,
            CollectorError::Protocol(
                ProtocolError::ServerError(_) | ProtocolError::UnexpectedResponse { .. }
            )
        )
    }
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Connection closed unexpectedly")]
    Closed,

    #[error("Connection timeout after {0}ms")]
    Timeout(u64),
}

/// Reply framing errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid reply type byte: {0:#04x}")]
    InvalidType(u8),

    #[error("Invalid bulk reply length: {0}")]
    InvalidLength(String),

    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: String, actual: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CollectorError>;

/// Classify an IO error raised while talking to an instance.
///
/// `timeout_ms` is the read timeout in force, used for the message.
pub fn classify_io_error(err: io::Error, timeout_ms: u64) -> CollectorError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            ConnectionError::Timeout(timeout_ms).into()
        }
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => ConnectionError::Closed.into(),
        _ => CollectorError::Io(err),
    }
}

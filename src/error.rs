//! Error types for pipelink.

use thiserror::Error;

/// Main error type for all pipelink operations.
#[derive(Debug, Error)]
pub enum PipeError {
    /// I/O error during pipe operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A size exceeded its ceiling: an oversize write, a malformed packet
    /// header, or a reassembled message past the configured limit.
    #[error("length error: {0}")]
    Length(String),

    /// Protocol error (unexpected packet in the message stream).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Write on a closed or never-connected endpoint.
    #[error("endpoint is not connected")]
    NotConnected,

    /// A write was cancelled cooperatively through its token.
    #[error("write cancelled")]
    Cancelled,

    /// The watcher task died abnormally (a panicking event handler).
    #[error("watcher task failed: {0}")]
    Task(String),
}

/// Result type alias using [`PipeError`].
pub type Result<T> = std::result::Result<T, PipeError>;

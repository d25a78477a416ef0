//! Git transport error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while framing or decoding protocol data.
#[derive(Debug, Error)]
pub enum GitError {
    /// Invalid pkt-line format.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// Request body could not be decoded.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the process gateway when mapping request paths onto the
/// repository root.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request path tries to leave the repository root.
    #[error("path escapes repository root: {0}")]
    PathEscapesRoot(String),

    /// The requested file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Any other filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Returns true when the failure means "nothing there" rather than a
    /// broken server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PathEscapesRoot(_))
    }
}

//! Client error taxonomy.
//!
//! Every failure is terminal for the call that hit it; nothing here is
//! retried by the client.

use qcr_core::Command;
use thiserror::Error;

/// Errors surfaced by client calls.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The connection could not be established.
    #[error("failed to connect to {url}: {reason}")]
    Connection {
        /// Endpoint that was dialled.
        url: String,
        /// Why the dial failed.
        reason: String,
    },

    /// A send was attempted while the connection was not open.
    #[error("socket not connected")]
    NotConnected,

    /// No matching response arrived in time.
    #[error("timeout waiting for {command} response after {timeout_ms}ms")]
    Timeout {
        /// Command that went unanswered.
        command: Command,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },

    /// The connection closed while the call was outstanding.
    #[error("connection closed while waiting for {command}")]
    ConnectionClosed {
        /// Command that was abandoned.
        command: Command,
    },

    /// The server answered `success: false`. Displays the server's message
    /// verbatim.
    #[error("{message}")]
    CommandFailed {
        /// Command that failed.
        command: Command,
        /// Server-supplied reason.
        message: String,
    },

    /// Under the reject policy, a call for a command that already has one
    /// outstanding.
    #[error("{command} is already awaiting a response")]
    AlreadyPending {
        /// Command with the outstanding call.
        command: Command,
    },

    /// A successful response whose fields do not fit the command's result
    /// shape.
    #[error("invalid {command} payload: {reason}")]
    InvalidPayload {
        /// Command whose result failed to decode.
        command: Command,
        /// Decode error.
        reason: String,
    },

    /// An inbound frame that cannot be correlated. Logged and dropped by
    /// the client; never returned from a call.
    #[error("malformed response frame: {reason}")]
    MalformedResponse {
        /// What was wrong with the frame.
        reason: String,
    },
}

/// Discriminant of [`RpcError`], for callers that map failures to
/// user-facing messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    /// [`RpcError::Connection`]
    Connection,
    /// [`RpcError::NotConnected`]
    NotConnected,
    /// [`RpcError::Timeout`]
    Timeout,
    /// [`RpcError::ConnectionClosed`]
    ConnectionClosed,
    /// [`RpcError::CommandFailed`]
    CommandFailed,
    /// [`RpcError::AlreadyPending`]
    AlreadyPending,
    /// [`RpcError::InvalidPayload`]
    InvalidPayload,
    /// [`RpcError::MalformedResponse`]
    MalformedResponse,
}

impl RpcError {
    /// The variant without its data.
    pub fn kind(&self) -> RpcErrorKind {
        match self {
            Self::Connection { .. } => RpcErrorKind::Connection,
            Self::NotConnected => RpcErrorKind::NotConnected,
            Self::Timeout { .. } => RpcErrorKind::Timeout,
            Self::ConnectionClosed { .. } => RpcErrorKind::ConnectionClosed,
            Self::CommandFailed { .. } => RpcErrorKind::CommandFailed,
            Self::AlreadyPending { .. } => RpcErrorKind::AlreadyPending,
            Self::InvalidPayload { .. } => RpcErrorKind::InvalidPayload,
            Self::MalformedResponse { .. } => RpcErrorKind::MalformedResponse,
        }
    }

    /// The command the failure belongs to, when it belongs to one.
    pub fn command(&self) -> Option<Command> {
        match self {
            Self::Timeout { command, .. }
            | Self::ConnectionClosed { command }
            | Self::CommandFailed { command, .. }
            | Self::AlreadyPending { command }
            | Self::InvalidPayload { command, .. } => Some(*command),
            Self::Connection { .. } | Self::NotConnected | Self::MalformedResponse { .. } => None,
        }
    }

    /// Whether the failure came from the connection rather than the call.
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::NotConnected | Self::ConnectionClosed { .. }
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, RpcError>;

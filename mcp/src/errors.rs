use thiserror::Error;

use crate::rpc::JsonRpcError;

/// Session-level errors. Tool failures are not here on purpose: they travel
/// as `success: false` envelopes inside a normal response, so only channel
/// and protocol problems surface as Rust errors.
#[derive(Error, Debug)]
pub enum McpError {
    /// The channel itself is unusable (spawn failure, broken pipe, EOF).
    /// Fatal to the session.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A message arrived that does not fit the wire contract. Fatal to the
    /// session.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation attempted on a session that is closed or never reached
    /// `Ready`.
    #[error("Session is not connected")]
    NotConnected,

    /// Tool name not present in the discovered registry. Raised host-side
    /// before any wire traffic.
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// A structured error returned by the server for this request.
    #[error("Server error [{}]: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Result type for session operations
pub type McpResult<T> = Result<T, McpError>;

// Wire protocol and both ends of the papers tool channel:
// - rpc: JSON-RPC 2.0 message shapes and MCP-specific types
// - framing: Content-Length framed reads/writes shared by host and server
// - host: session state machine, child-process transport, call correlation
// - server: request loop, tool registry/dispatch, result cache, analysis

pub mod errors;
pub mod framing;
pub mod host;
pub mod rpc;
pub mod server;

pub use errors::{McpError, McpResult};
pub use host::{Session, SessionState};
pub use server::service::PapersService;

mod transport;

pub use transport::Transport;

use log::{info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::errors::{McpError, McpResult};
use crate::rpc::{
    CallToolParams, ClientInfo, InitializeParams, InitializeResult, ListToolsResult, Request,
    Tool, METHOD_CALL_TOOL, METHOD_EXIT, METHOD_INITIALIZE, METHOD_LIST_TOOLS, METHOD_SHUTDOWN,
};

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Session lifecycle. `Failed` is terminal and reachable from any
/// non-`Closed` state on a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Handshaking,
    Ready,
    Closed,
    Failed,
}

/// One host↔server pairing: the transport, the negotiated tool registry and
/// the correlation counter. Calls take `&mut self`, which is what enforces
/// the single-outstanding-call contract — the next call cannot be issued
/// until the previous one resolved.
pub struct Session {
    transport: Transport,
    state: SessionState,
    next_request_id: AtomicU64,
    tools: Vec<Tool>,
}

impl Session {
    /// Spawn the server process and run the handshake. On any failure the
    /// child and pipes are released before the error is returned.
    pub async fn connect(command: &[String], env: &HashMap<String, String>) -> McpResult<Self> {
        let transport = Transport::spawn(command, env)?;
        Self::handshake(transport).await
    }

    /// Like `connect`, but over an already-open duplex byte channel.
    pub async fn connect_streams<R, W>(reader: R, writer: W) -> McpResult<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::handshake(Transport::from_streams(reader, writer)).await
    }

    async fn handshake(transport: Transport) -> McpResult<Self> {
        let mut session = Session {
            transport,
            state: SessionState::Handshaking,
            next_request_id: AtomicU64::new(1),
            tools: Vec::new(),
        };

        match session.initialize().await {
            Ok(ack) => {
                info!(
                    "Connected to '{}' v{}",
                    ack.server_info.name, ack.server_info.version
                );
                session.state = SessionState::Ready;
                Ok(session)
            }
            Err(e) => {
                session.state = SessionState::Failed;
                session.transport.close().await;
                Err(e)
            }
        }
    }

    /// Send the hello message and wait for the acknowledgement. Called
    /// exactly once, from `handshake`.
    async fn initialize(&mut self) -> McpResult<InitializeResult> {
        let params = InitializeParams {
            client_info: ClientInfo {
                name: APP_NAME.to_string(),
                version: APP_VERSION.to_string(),
            },
        };
        let result = self
            .request(
                METHOD_INITIALIZE,
                Some(serde_json::to_value(params)?),
                HANDSHAKE_TIMEOUT,
                "handshake acknowledgement",
            )
            .await?;

        serde_json::from_value::<InitializeResult>(result)
            .map_err(|e| McpError::Protocol(format!("Malformed initialize reply: {}", e)))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The registry discovered by `list_tools`. Empty until then.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Fetch the server's immutable tool registry. Must be called before
    /// any `call_tool`.
    pub async fn list_tools(&mut self) -> McpResult<Vec<Tool>> {
        self.ensure_ready()?;
        let result = self
            .request(METHOD_LIST_TOOLS, None, CALL_TIMEOUT, "tool registry")
            .await?;
        let listed = serde_json::from_value::<ListToolsResult>(result)
            .map_err(|e| McpError::Protocol(format!("Malformed tools reply: {}", e)))?;
        self.tools = listed.tools;
        Ok(self.tools.clone())
    }

    /// Invoke a named tool. Unknown names fail fast locally — no wire
    /// round-trip is spent on them.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<Value> {
        self.ensure_ready()?;
        if !self.tools.iter().any(|t| t.name == name) {
            return Err(McpError::UnknownTool(name.to_string()));
        }

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.request(
            METHOD_CALL_TOOL,
            Some(serde_json::to_value(params)?),
            CALL_TIMEOUT,
            "tool result",
        )
        .await
    }

    /// Close from any state: best-effort shutdown/exit to the server, then
    /// transport teardown. Subsequent operations fail with `NotConnected`.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        // Polite shutdown per the protocol; the kill in transport close
        // covers a server that ignores it.
        let shutdown_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let shutdown = Request::new(Some(json!(shutdown_id)), METHOD_SHUTDOWN.to_string(), None);
        if let Ok(payload) = serde_json::to_string(&shutdown) {
            let _ = self.transport.send(payload).await;
        }
        let exit = Request::new(None, METHOD_EXIT.to_string(), None);
        if let Ok(payload) = serde_json::to_string(&exit) {
            let _ = self.transport.send(payload).await;
        }

        self.transport.close().await;
        self.state = SessionState::Closed;
        info!("Session closed");
    }

    fn ensure_ready(&self) -> McpResult<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            _ => Err(McpError::NotConnected),
        }
    }

    /// Issue one correlated request and await its response. The fresh id
    /// comes from the session counter; the transport routes the response
    /// back through a oneshot registered under that id.
    async fn request(
        &mut self,
        method: &'static str,
        params: Option<Value>,
        timeout: Duration,
        what: &'static str,
    ) -> McpResult<Value> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.transport.register(id, method).await;

        let request = Request::new(Some(json!(id)), method.to_string(), params);
        let payload = serde_json::to_string(&request)?;

        if let Err(e) = self.transport.send(payload).await {
            self.transport.unregister(id).await;
            self.state = SessionState::Failed;
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(e))) => {
                // A structured server error leaves the channel healthy; a
                // transport failure does not.
                if matches!(e, McpError::Transport(_)) {
                    self.state = SessionState::Failed;
                }
                Err(e)
            }
            Ok(Err(_closed)) => {
                self.state = SessionState::Failed;
                Err(McpError::Transport(
                    "Connection lost while awaiting response".to_string(),
                ))
            }
            Err(_elapsed) => {
                warn!("Request id={} ({}) timed out", id, method);
                self.transport.unregister(id).await;
                Err(McpError::Timeout(what))
            }
        }
    }
}

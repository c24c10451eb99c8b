// Duplex channel to a tool server. The usual shape is a spawned child
// process with piped stdio; any other duplex byte pair works through
// `from_streams` (used by the in-process tests).

use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::{self, JoinHandle};
use std::sync::Arc;

use crate::errors::{McpError, McpResult};
use crate::framing;
use crate::rpc::{Message, Response};

const CHANNEL_BUFFER_SIZE: usize = 32;
const PARSE_BUFFER_SIZE: usize = 4096;
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A request awaiting its response. Resolves to the result payload, a
/// structured server error, or a transport error when the channel died
/// underneath it.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub responder: oneshot::Sender<Result<Value, McpError>>,
    pub method: String, // For logging
}

pub(crate) type PendingMap = Arc<Mutex<HashMap<u64, PendingCall>>>;

/// One live channel to a server, with its writer/reader tasks and (when
/// spawned) the child process handle. `close` is idempotent and releases
/// every OS resource on every path.
pub struct Transport {
    outgoing: Option<mpsc::Sender<String>>,
    pending: PendingMap,
    child: Option<Child>,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
}

impl Transport {
    /// Spawn `command` as a child process and frame messages over its
    /// stdio. The child's stderr is drained into our log so a wedged
    /// server is visible.
    pub fn spawn(command: &[String], env: &HashMap<String, String>) -> McpResult<Self> {
        let executable = command
            .first()
            .ok_or_else(|| McpError::Transport("Empty server command".to_string()))?;
        info!("Launching tool server: {}", command.join(" "));

        let mut cmd = Command::new(executable);
        cmd.args(&command[1..]);
        cmd.envs(env);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::Transport(format!("Failed to spawn '{}': {}", executable, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("Failed to open server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("Failed to open server stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| McpError::Transport("Failed to open server stderr".to_string()))?;

        let stderr_task = task::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => warn!("[server stderr] {}", line.trim_end()),
                    Err(e) => {
                        error!("Error reading server stderr: {}", e);
                        break;
                    }
                }
            }
        });

        let mut transport = Self::from_streams(stdout, stdin);
        transport.child = Some(child);
        transport.stderr_task = Some(stderr_task);
        Ok(transport)
    }

    /// Wrap an already-open duplex byte pair.
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<String>(CHANNEL_BUFFER_SIZE);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let writer_task = task::spawn(writer_loop(writer, outgoing_rx));
        let reader_task = task::spawn(reader_loop(BufReader::new(reader), pending.clone()));

        Self {
            outgoing: Some(outgoing_tx),
            pending,
            child: None,
            reader_task: Some(reader_task),
            writer_task: Some(writer_task),
            stderr_task: None,
        }
    }

    /// Queue one serialized message for the writer task.
    pub(crate) async fn send(&self, payload: String) -> McpResult<()> {
        let outgoing = self.outgoing.as_ref().ok_or(McpError::NotConnected)?;
        outgoing
            .send(payload)
            .await
            .map_err(|_| McpError::Transport("Writer task is gone".to_string()))
    }

    /// Register interest in the response carrying `id`.
    pub(crate) async fn register(
        &self,
        id: u64,
        method: &str,
    ) -> oneshot::Receiver<Result<Value, McpError>> {
        let (responder, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingCall {
                responder,
                method: method.to_string(),
            },
        );
        rx
    }

    /// Forget a request that timed out or failed to send. A late response
    /// for the id is then logged and dropped by the reader.
    pub(crate) async fn unregister(&self, id: u64) {
        self.pending.lock().await.remove(&id);
    }

    /// Tear the channel down: stop the writer, kill the child if any, join
    /// the I/O tasks and fail whatever was still pending. Safe to call
    /// more than once.
    pub async fn close(&mut self) {
        // Dropping the sender ends the writer loop, which closes the peer's
        // read side.
        self.outgoing.take();

        if let Some(mut child) = self.child.take() {
            match child.kill().await {
                Ok(()) => debug!("Tool server process killed"),
                Err(e) => warn!("Failed to kill tool server process: {}", e),
            }
        }

        for handle in [
            self.writer_task.take(),
            self.reader_task.take(),
            self.stderr_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            if tokio::time::timeout(TASK_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("Transport task did not stop in time");
            }
        }

        fail_pending(&self.pending, "Session closed").await;
    }
}

async fn writer_loop<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::Receiver<String>) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = framing::write_message(&mut writer, &payload).await {
            error!("Error writing to server: {}. Stopping writer.", e);
            break;
        }
    }
    debug!("Writer loop exited");
}

async fn reader_loop<R: AsyncBufRead + Unpin>(mut reader: R, pending: PendingMap) {
    let mut buffer = Vec::with_capacity(PARSE_BUFFER_SIZE);
    loop {
        match framing::read_message(&mut reader, &mut buffer).await {
            Ok(Some(payload)) => match serde_json::from_str::<Message>(&payload) {
                Ok(Message::Response(response)) => handle_response(response, &pending).await,
                Ok(Message::Notification(n)) => {
                    debug!("Ignoring notification '{}' from server", n.method)
                }
                Ok(Message::Request(req)) => {
                    warn!("Unexpected request '{}' from server; ignoring", req.method)
                }
                Err(e) => {
                    error!("Undecodable message from server: {}. Payload: {}", e, payload)
                }
            },
            Ok(None) => {
                info!("Server closed the channel (EOF)");
                break;
            }
            Err(e) => {
                error!("Error reading from server: {}", e);
                break;
            }
        }
    }
    fail_pending(&pending, "Server connection closed").await;
}

/// Route a response to whoever registered its correlation id. Responses
/// for unknown or already-abandoned ids are dropped, never a crash.
async fn handle_response(response: Response, pending: &PendingMap) {
    let request_id = match &response.id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };

    let request_id = match request_id {
        Some(id) => id,
        None => {
            warn!("Response with non-numeric id {:?}; ignoring", response.id);
            return;
        }
    };

    match pending.lock().await.remove(&request_id) {
        Some(call) => {
            debug!("Response for id={} method='{}'", request_id, call.method);
            let _ = call.responder.send(response.result().map_err(McpError::Rpc));
        }
        None => {
            warn!(
                "Response for unknown or timed-out request id {}; ignoring",
                request_id
            );
        }
    }
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut requests = pending.lock().await;
    if requests.is_empty() {
        return;
    }
    warn!("{} request(s) abandoned: {}", requests.len(), reason);
    for (_, call) in requests.drain() {
        let _ = call
            .responder
            .send(Err(McpError::Transport(reason.to_string())));
    }
}

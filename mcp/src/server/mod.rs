// The server side of the channel: a read loop that never blocks on
// provider I/O. Tool calls run on a bounded pool of tasks; every response
// funnels through one writer task so frames never interleave on stdout.

pub mod analysis;
pub mod cache;
pub mod intent;
pub mod service;
#[cfg(test)]
pub(crate) mod testing;
pub mod tools;

use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, Semaphore};
use tokio::task;

use crate::errors::{McpError, McpResult};
use crate::framing;
use crate::rpc::{
    CallToolParams, InitializeResult, JsonRpcError, Request, Response, ServerInfo,
    INVALID_PARAMS, METHOD_CALL_TOOL, METHOD_EXIT, METHOD_INITIALIZE, METHOD_LIST_TOOLS,
    METHOD_NOT_FOUND, METHOD_SHUTDOWN, PARSE_ERROR,
};
use crate::server::service::PapersService;
use crate::server::tools::ToolKind;

pub const SERVER_NAME: &str = "papers-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// Tool calls in flight at once. One interactive host issues calls one at a
// time; the bound is headroom, not throughput tuning.
const MAX_CONCURRENT_CALLS: usize = 4;
const RESPONSE_BUFFER: usize = 32;
const PARSE_BUFFER_SIZE: usize = 4096;

/// Serve one host over this process's stdio. Logging goes to stderr, so
/// stdout stays a clean protocol channel.
pub async fn serve_stdio(service: Arc<PapersService>) -> McpResult<()> {
    serve_connection(
        service,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve one host over an arbitrary duplex byte pair. Returns when the
/// host disconnects or asks for shutdown.
pub async fn serve_connection<R, W>(
    service: Arc<PapersService>,
    mut reader: R,
    writer: W,
) -> McpResult<()>
where
    R: AsyncBufRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    info!("{} v{} ready", SERVER_NAME, SERVER_VERSION);

    let (response_tx, mut response_rx) = mpsc::channel::<Response>(RESPONSE_BUFFER);
    let writer_task = task::spawn(async move {
        let mut writer = writer;
        while let Some(response) = response_rx.recv().await {
            match serde_json::to_string(&response) {
                Ok(payload) => {
                    if let Err(e) = framing::write_message(&mut writer, &payload).await {
                        error!("Failed to write response: {}. Stopping writer.", e);
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize response: {}", e),
            }
        }
    });

    let limiter = Arc::new(Semaphore::new(MAX_CONCURRENT_CALLS));
    let mut buffer = Vec::with_capacity(PARSE_BUFFER_SIZE);
    let mut shutdown_requested = false;

    loop {
        if shutdown_requested {
            info!("Shutdown requested; leaving request loop");
            break;
        }

        let payload = match framing::read_message(&mut reader, &mut buffer).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!("Host closed the channel (EOF)");
                break;
            }
            Err(McpError::Protocol(e)) => {
                // Unframeable input: report once, then give up the channel.
                error!("Protocol error from host: {}", e);
                let _ = response_tx
                    .send(Response::failure(
                        Value::Null,
                        JsonRpcError::new(PARSE_ERROR, e),
                    ))
                    .await;
                break;
            }
            Err(e) => {
                error!("Error reading from host: {}", e);
                break;
            }
        };

        let request = match serde_json::from_str::<Request>(&payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to parse JSON-RPC request: {}", e);
                let _ = response_tx
                    .send(Response::failure(
                        Value::Null,
                        JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                    ))
                    .await;
                continue;
            }
        };

        match request.method.as_str() {
            METHOD_EXIT => {
                info!("Received exit notification. Exiting immediately.");
                break;
            }
            METHOD_SHUTDOWN => {
                info!("Received shutdown request. Will exit after responding.");
                if let Some(id) = request.id {
                    let _ = response_tx.send(Response::success(id, Value::Null)).await;
                }
                shutdown_requested = true;
            }
            METHOD_INITIALIZE => {
                let Some(id) = request.id else { continue };
                let ack = InitializeResult {
                    server_info: ServerInfo {
                        name: SERVER_NAME.to_string(),
                        version: SERVER_VERSION.to_string(),
                    },
                    status: "initialized".to_string(),
                };
                match serde_json::to_value(ack) {
                    Ok(result) => {
                        let _ = response_tx.send(Response::success(id, result)).await;
                    }
                    Err(e) => error!("Failed to serialize initialize ack: {}", e),
                }
            }
            METHOD_LIST_TOOLS => {
                let Some(id) = request.id else { continue };
                let listed = crate::rpc::ListToolsResult {
                    tools: tools::descriptors(),
                };
                match serde_json::to_value(listed) {
                    Ok(result) => {
                        let _ = response_tx.send(Response::success(id, result)).await;
                    }
                    Err(e) => error!("Failed to serialize tool registry: {}", e),
                }
            }
            METHOD_CALL_TOOL => {
                let Some(id) = request.id else {
                    warn!("tools/call without an id; ignoring");
                    continue;
                };
                handle_call(
                    id,
                    request.params,
                    service.clone(),
                    limiter.clone(),
                    response_tx.clone(),
                );
            }
            other => {
                warn!("Method not found: {}", other);
                if let Some(id) = request.id {
                    let _ = response_tx
                        .send(Response::failure(
                            id,
                            JsonRpcError::new(
                                METHOD_NOT_FOUND,
                                format!("Method not found: {}", other),
                            ),
                        ))
                        .await;
                }
            }
        }
    }

    // In-flight calls hold sender clones; the writer drains them before
    // exiting.
    drop(response_tx);
    let _ = writer_task.await;
    info!("{} request loop exited", SERVER_NAME);
    Ok(())
}

/// Validate the call params and run the tool on a pooled task, so a slow
/// provider never stalls the read loop.
fn handle_call(
    id: Value,
    params: Option<Value>,
    service: Arc<PapersService>,
    limiter: Arc<Semaphore>,
    response_tx: mpsc::Sender<Response>,
) {
    let params = match params
        .ok_or_else(|| "Missing params".to_string())
        .and_then(|p| {
            serde_json::from_value::<CallToolParams>(p).map_err(|e| e.to_string())
        }) {
        Ok(params) => params,
        Err(e) => {
            let response = Response::failure(
                id,
                JsonRpcError::new(INVALID_PARAMS, format!("Invalid tools/call params: {}", e)),
            );
            spawn_send(response_tx, response);
            return;
        }
    };

    let Some(kind) = ToolKind::from_name(&params.name) else {
        let response = Response::failure(
            id,
            JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Tool not found: {}", params.name),
            ),
        );
        spawn_send(response_tx, response);
        return;
    };

    task::spawn(async move {
        // Bounded pool: waits for a slot rather than fanning out without
        // limit.
        let _permit = match limiter.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // pool closed, server is shutting down
        };
        let envelope = tools::dispatch(kind, &params.arguments, &service).await;
        if response_tx.send(Response::success(id, envelope)).await.is_err() {
            // The host went away mid-call. The result is orphaned; drop it.
            warn!("Host disconnected before receiving '{}' result", params.name);
        }
    });
}

fn spawn_send(response_tx: mpsc::Sender<Response>, response: Response) {
    task::spawn(async move {
        if response_tx.send(response).await.is_err() {
            warn!("Host disconnected before receiving error response");
        }
    });
}

// Defines the core JSON-RPC 2.0 structures and the MCP-specific types
// exchanged between the papers host and server.

use serde::{Deserialize, Serialize};
use serde_json::{self, Value};

// Standard JSON-RPC error codes used on this channel.
pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SERVER_ERROR: i64 = -32000;

// Method names; `call`/`result` pairs share the request's correlation id.
pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_LIST_TOOLS: &str = "tools/list";
pub const METHOD_CALL_TOOL: &str = "tools/call";
pub const METHOD_SHUTDOWN: &str = "shutdown";
pub const METHOD_EXIT: &str = "exit";

// --- Core JSON-RPC 2.0 Structures ---

// Union type for all message kinds
#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

// A message with an id and a method is a request, with an id but no method
// a response, and with a method but no id a notification.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        if value.get("id").is_some() {
            if value.get("method").is_some() {
                Ok(Message::Request(serde_json::from_value(value).map_err(
                    |e| serde::de::Error::custom(format!("Invalid Request: {}", e)),
                )?))
            } else {
                Ok(Message::Response(serde_json::from_value(value).map_err(
                    |e| serde::de::Error::custom(format!("Invalid Response: {}", e)),
                )?))
            }
        } else if value.get("method").is_some() {
            Ok(Message::Notification(
                serde_json::from_value(value).map_err(|e| {
                    serde::de::Error::custom(format!("Invalid Notification: {}", e))
                })?,
            ))
        } else {
            Err(serde::de::Error::custom("Invalid message format"))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Request {
    pub jsonrpc: String, // Always "2.0"
    pub id: Option<Value>, // Correlation id; None makes this a notification
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: Option<Value>, method: String, params: Option<Value>) -> Self {
        Request {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Response {
    pub jsonrpc: String, // Always "2.0"
    pub id: Value, // Matches the request id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Response {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Response {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    // Helper to get the result, converting the Option pair to a Result
    pub fn result(&self) -> Result<Value, JsonRpcError> {
        if let Some(error) = &self.error {
            Err(error.clone())
        } else if let Some(result) = &self.result {
            Ok(result.clone())
        } else {
            Err(JsonRpcError {
                code: INTERNAL_ERROR,
                message: "Response missing both result and error".to_string(),
                data: None,
            })
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Notification {
    pub jsonrpc: String, // Always "2.0"
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: String, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method,
            params,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

// --- MCP Specific Types ---

// `initialize` request parameters — the hello half of the handshake.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub client_info: ClientInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

// `initialize` response result — the hello-ack.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub server_info: ServerInfo,
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// A published tool: unique name, human description and a JSON Schema for
/// its arguments. The set is fixed at server start.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

// `tools/list` response result
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

// `tools/call` request parameters
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

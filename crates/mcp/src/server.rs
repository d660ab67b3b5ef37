//! MCP server implementation.
//!
//! `McpServer` is the request dispatcher: it turns one input line into
//! exactly one `JsonRpcResponse`. The `run` / `run_oneshot` loops own the
//! transport and decide when responses are written.
//!
//! Parsing, validation and routing are synchronous. The only suspension
//! point is the backend call for `tools/call`, which runs on its own task
//! and is joined before the response is built.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

use selector_tool_runtime::{validate, Backend, ToolCallResult, ToolRegistry};

use crate::error::McpError;
use crate::transport::{Inbound, McpTransport, MessageSink};
use crate::types::*;

/// Pause after an empty input line before reading again.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// When responses are written relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrder {
    /// Each response is written as soon as it is ready. Responses to
    /// concurrent requests may overtake each other; ids still correlate.
    #[default]
    Completion,
    /// Responses are written in request-arrival order. Backend calls still
    /// run concurrently; a fast response waits for slower earlier ones.
    Arrival,
}

/// MCP server that bridges a `ToolRegistry` and a `Backend` to MCP clients.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    backend: Arc<dyn Backend>,
    server_name: String,
    server_version: String,
    order: ResponseOrder,
}

impl McpServer {
    /// Create a new MCP server over the given registry and backend.
    pub fn new(registry: ToolRegistry, backend: Arc<dyn Backend>) -> Self {
        Self {
            registry: Arc::new(registry),
            backend,
            server_name: "selector-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            order: ResponseOrder::default(),
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn with_order(mut self, order: ResponseOrder) -> Self {
        self.order = order;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    // ── Transport loops ─────────────────────────────────────────────

    /// Continuous mode: serve requests until the input closes.
    ///
    /// Each line is dispatched on its own task so a slow backend never
    /// delays reading. On EOF, reading stops and the loop waits for every
    /// in-flight request to write its response before returning.
    pub async fn run<T: McpTransport>(&self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, order = ?self.order, "MCP server starting");

        let sink = transport.sink();
        let mut emitter = Emitter::start(self.order, sink);
        let mut accepted: u64 = 0;

        let outcome = loop {
            let inbound = match transport.receive().await {
                Ok(inbound) => inbound,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read from transport");
                    break Err(e);
                }
            };
            let line = match inbound {
                Inbound::Line(line) => line,
                Inbound::Undecodable => {
                    tracing::warn!("Input line is not valid UTF-8");
                    let err = McpError::Parse("input is not valid UTF-8".to_string());
                    emitter.ready(error_response(None, &err)).await;
                    continue;
                }
                Inbound::Idle => {
                    tokio::time::sleep(IDLE_BACKOFF).await;
                    continue;
                }
                Inbound::Closed => {
                    tracing::info!("Transport closed, shutting down");
                    break Ok(());
                }
            };

            accepted += 1;
            tracing::debug!(message = %line, "Received message");

            let server = self.clone();
            let handle = tokio::spawn(async move { server.respond(&line).await });
            emitter.pending(handle).await;
        };

        emitter.finish().await;
        tracing::info!(requests = accepted, "MCP server stopped");
        outcome
    }

    /// One-shot mode: read all input, answer only the last JSON object line.
    ///
    /// Exactly one response is written, including when no request is found
    /// or reading fails.
    pub async fn run_oneshot<T: McpTransport>(&self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "MCP server running one-shot");
        let sink = transport.sink();

        let response = match transport.receive_all().await {
            Ok(input) => match last_json_object(&input) {
                Some(line) => {
                    let line = line.to_string();
                    let server = self.clone();
                    match tokio::spawn(async move { server.handle_line(&line).await }).await {
                        Ok(response) => response,
                        Err(e) => {
                            let err = McpError::Server(join_error_message(e));
                            tracing::error!(error = %err, "One-shot dispatch failed");
                            error_response(None, &err)
                        }
                    }
                }
                None => {
                    tracing::warn!("No JSON object found in one-shot input");
                    let err = McpError::Parse("no JSON object found in input".to_string());
                    error_response(None, &err)
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to read one-shot input");
                error_response(None, &McpError::Server(e.to_string()))
            }
        };

        let json = serde_json::to_string(&response)?;
        sink.send(&json).await
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// `handle_line`, with any panic turned into an internal error that
    /// keeps the request's id when it can be recovered.
    async fn respond(&self, line: &str) -> JsonRpcResponse {
        match AssertUnwindSafe(self.handle_line(line)).catch_unwind().await {
            Ok(response) => response,
            Err(payload) => {
                let err = McpError::Internal(panic_message(payload.as_ref()));
                tracing::error!(error = %err, "Dispatch panicked");
                error_response(peek_id(line), &err)
            }
        }
    }

    /// Parse one input line and produce its response.
    pub async fn handle_line(&self, line: &str) -> JsonRpcResponse {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON");
                return error_response(None, &McpError::Parse(e.to_string()));
            }
        };

        match parse_request(raw) {
            Ok(request) => self.handle_request(request).await,
            Err((id, err)) => {
                tracing::warn!(error = %err, "Invalid JSON-RPC request");
                error_response(id, &err)
            }
        }
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;

        match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(id),
            methods::TOOLS_DISCOVER => self.handle_discover(id),
            methods::TOOLS_LIST => self.handle_list_tools(id),
            methods::TOOLS_CALL => self.handle_call_tool(id, request.params).await,
            method => {
                tracing::warn!(method = %method, "Unknown method");
                error_response(id, &McpError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn handle_initialize(&self, id: Option<RpcId>) -> JsonRpcResponse {
        tracing::info!("Handling initialize");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        };
        success_response(id, result)
    }

    fn handle_discover(&self, id: Option<RpcId>) -> JsonRpcResponse {
        tracing::debug!("Handling tools/discover");

        let tools: Vec<DiscoveredTool> = self
            .registry
            .list()
            .into_iter()
            .map(DiscoveredTool::from)
            .collect();
        success_response(id, tools)
    }

    fn handle_list_tools(&self, id: Option<RpcId>) -> JsonRpcResponse {
        tracing::debug!("Handling tools/list");

        let tools: Vec<ToolInfo> = self.registry.list().into_iter().map(ToolInfo::from).collect();
        success_response(id, ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, id: Option<RpcId>, params: Option<Value>) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => {
                return error_response(id, &McpError::InvalidParams("missing params".to_string()))
            }
        };

        let call_params: CallToolParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return error_response(id, &McpError::InvalidParams(e.to_string())),
        };

        tracing::debug!(tool = %call_params.name, "Handling tools/call");

        let descriptor = match self.registry.get(&call_params.name) {
            Some(d) => d,
            None => {
                tracing::warn!(tool = %call_params.name, "Unknown tool");
                return error_response(id, &McpError::ToolNotFound(call_params.name));
            }
        };

        // Bad tool input is a tool-level failure: the RPC itself succeeded.
        let call = match validate(&descriptor.schema, &call_params.arguments)
            .and_then(|args| descriptor.kind.bind(args))
        {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(tool = %descriptor.name, error = %e, "Tool input rejected");
                return success_response(id, ToolCallResult::error(e.to_string()));
            }
        };

        let backend = self.backend.clone();
        let task = tokio::spawn(async move { call.invoke(backend.as_ref()).await });
        match task.await {
            Ok(result) => {
                tracing::debug!(tool = %descriptor.name, is_error = result.is_error(), "Tool call finished");
                success_response(id, result)
            }
            Err(e) => {
                let err = McpError::Internal(join_error_message(e));
                tracing::error!(tool = %descriptor.name, error = %err, "Tool task failed");
                error_response(id, &err)
            }
        }
    }
}

// ── Response emission ───────────────────────────────────────────────

/// Writes responses according to a `ResponseOrder`.
enum Emitter {
    /// Tasks write their own response when done.
    Completion {
        sink: Arc<dyn MessageSink>,
        tasks: JoinSet<()>,
    },
    /// A single writer task awaits handles in arrival order.
    Arrival {
        queue: mpsc::UnboundedSender<JoinHandle<JsonRpcResponse>>,
        writer: JoinHandle<()>,
    },
}

impl Emitter {
    fn start(order: ResponseOrder, sink: Arc<dyn MessageSink>) -> Self {
        match order {
            ResponseOrder::Completion => Emitter::Completion {
                sink,
                tasks: JoinSet::new(),
            },
            ResponseOrder::Arrival => {
                let (queue, mut rx) = mpsc::unbounded_channel::<JoinHandle<JsonRpcResponse>>();
                let writer = tokio::spawn(async move {
                    while let Some(handle) = rx.recv().await {
                        let response = match handle.await {
                            Ok(response) => response,
                            Err(e) => error_response(None, &McpError::Internal(join_error_message(e))),
                        };
                        write_response(sink.as_ref(), &response).await;
                    }
                });
                Emitter::Arrival { queue, writer }
            }
        }
    }

    /// Queue a response that is already known.
    async fn ready(&mut self, response: JsonRpcResponse) {
        self.pending(tokio::spawn(async move { response })).await;
    }

    /// Queue a response that will be produced by `handle`.
    async fn pending(&mut self, handle: JoinHandle<JsonRpcResponse>) {
        match self {
            Emitter::Completion { sink, tasks } => {
                let sink = sink.clone();
                tasks.spawn(async move {
                    let response = match handle.await {
                        Ok(response) => response,
                        Err(e) => error_response(None, &McpError::Internal(join_error_message(e))),
                    };
                    write_response(sink.as_ref(), &response).await;
                });
                // Reap finished writers so the set does not grow unbounded.
                while tasks.try_join_next().is_some() {}
            }
            Emitter::Arrival { queue, .. } => {
                if queue.send(handle).is_err() {
                    tracing::error!("Response writer stopped; dropping response");
                }
            }
        }
    }

    /// Wait until every queued response has been written.
    async fn finish(self) {
        match self {
            Emitter::Completion { mut tasks, .. } => {
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Response writer task failed");
                    }
                }
            }
            Emitter::Arrival { queue, writer } => {
                drop(queue);
                if let Err(e) = writer.await {
                    tracing::error!(error = %e, "Response writer task failed");
                }
            }
        }
    }
}

async fn write_response(sink: &dyn MessageSink, response: &JsonRpcResponse) {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            return;
        }
    };
    tracing::debug!(response = %json, "Sending response");
    if let Err(e) = sink.send(&json).await {
        tracing::warn!(error = %e, "Failed to write response");
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Validate the envelope of a parsed JSON value.
///
/// On failure, returns the id when it could be extracted.
fn parse_request(raw: Value) -> Result<JsonRpcRequest, (Option<RpcId>, McpError)> {
    let obj = match raw {
        Value::Object(obj) => obj,
        _ => {
            return Err((
                None,
                McpError::InvalidRequest("request must be a JSON object".to_string()),
            ))
        }
    };

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(RpcId::Number(n.clone())),
        Some(Value::String(s)) => Some(RpcId::String(s.clone())),
        Some(_) => {
            return Err((
                None,
                McpError::InvalidRequest("id must be a string, number, or null".to_string()),
            ))
        }
    };

    let jsonrpc = match obj.get("jsonrpc") {
        None => None,
        Some(Value::String(v)) if v == JSONRPC_VERSION => Some(v.clone()),
        Some(other) => {
            return Err((
                id,
                McpError::InvalidRequest(format!("unsupported jsonrpc version {}", other)),
            ))
        }
    };

    let method = match obj.get("method") {
        Some(Value::String(m)) => m.clone(),
        Some(_) => {
            return Err((id, McpError::InvalidRequest("method must be a string".to_string())))
        }
        None => return Err((id, McpError::InvalidRequest("missing method".to_string()))),
    };

    let params = obj.get("params").filter(|p| !p.is_null()).cloned();

    Ok(JsonRpcRequest {
        jsonrpc,
        id,
        method,
        params,
    })
}

/// Best-effort id extraction from a raw line.
fn peek_id(line: &str) -> Option<RpcId> {
    let raw: Value = serde_json::from_str(line).ok()?;
    match raw.get("id")? {
        Value::Number(n) => Some(RpcId::Number(n.clone())),
        Value::String(s) => Some(RpcId::String(s.clone())),
        _ => None,
    }
}

/// Last line that looks like a JSON object (`{` ... `}`).
pub fn last_json_object(input: &str) -> Option<&str> {
    input
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{') && line.ends_with('}'))
}

fn success_response<T: serde::Serialize>(id: Option<RpcId>, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(val) => JsonRpcResponse::success(id, val),
        Err(e) => error_response(id, &McpError::Serialize(e)),
    }
}

fn error_response(id: Option<RpcId>, err: &McpError) -> JsonRpcResponse {
    let rpc = err.to_rpc_error();
    JsonRpcResponse::error(id, rpc.code, rpc.message)
}

fn join_error_message(e: JoinError) -> String {
    if e.is_panic() {
        panic_message(e.into_panic().as_ref())
    } else {
        e.to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

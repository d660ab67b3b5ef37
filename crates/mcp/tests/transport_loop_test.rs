//! Integration tests for the continuous and one-shot transport loops.
//!
//! Tests drive `McpServer` over in-memory duplex streams with a scripted
//! backend whose chat endpoint is slow and whose other endpoints are fast.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};

use selector_mcp::{McpServer, ResponseOrder, StreamTransport};
use selector_tool_runtime::{Backend, BackendRequest, Endpoint, ToolCallResult, ToolRegistry};

const SLOW: Duration = Duration::from_millis(400);
const TIMEOUT: Duration = Duration::from_secs(5);

/// Chat requests take `SLOW`; everything else answers immediately.
struct ScriptedBackend;

#[async_trait]
impl Backend for ScriptedBackend {
    async fn invoke(&self, request: BackendRequest) -> ToolCallResult {
        match request {
            BackendRequest::Post { endpoint: Endpoint::Chat, body } => {
                tokio::time::sleep(SLOW).await;
                ToolCallResult::completed(json!({"content": format!("answer to {}", body["content"])}))
            }
            BackendRequest::Post { body, .. } => ToolCallResult::completed(json!({"echo": body})),
            BackendRequest::Get { filter, .. } => {
                let phrases = json!([
                    {"phrase": "show devices", "source": "user"},
                    {"phrase": "top talkers", "source": "widget"}
                ]);
                match filter {
                    Some(f) => match f.apply(phrases) {
                        Ok(v) => ToolCallResult::completed(v),
                        Err(e) => ToolCallResult::error(e.to_string()),
                    },
                    None => ToolCallResult::completed(phrases),
                }
            }
        }
    }
}

fn server(order: ResponseOrder) -> McpServer {
    McpServer::new(ToolRegistry::selector(), Arc::new(ScriptedBackend)).with_order(order)
}

/// Client half of a running continuous-mode server.
struct Client {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    server: tokio::task::JoinHandle<()>,
}

impl Client {
    fn start(order: ResponseOrder) -> Self {
        let (input, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, output) = tokio::io::duplex(64 * 1024);
        let server = server(order);
        let handle = tokio::spawn(async move {
            let mut transport = StreamTransport::new(BufReader::new(server_in), server_out);
            server.run(&mut transport).await.unwrap();
        });
        Self {
            input,
            output: BufReader::new(output).lines(),
            server: handle,
        }
    }

    async fn send(&mut self, request: Value) {
        self.send_raw(&request.to_string()).await;
    }

    async fn send_raw(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
        self.input.flush().await.unwrap();
    }

    async fn next(&mut self) -> Value {
        let line = tokio::time::timeout(TIMEOUT, self.output.next_line())
            .await
            .expect("timed out waiting for response")
            .unwrap()
            .expect("output closed");
        serde_json::from_str(&line).unwrap()
    }

    /// Close input and wait for the server loop to exit.
    async fn close(self) -> Lines<BufReader<DuplexStream>> {
        drop(self.input);
        tokio::time::timeout(TIMEOUT, self.server)
            .await
            .expect("server did not stop")
            .unwrap();
        self.output
    }
}

fn ask(id: i64, content: &str) -> Value {
    json!({
        "jsonrpc": "2.0", "id": id, "method": "tools/call",
        "params": {"name": "ask_selector", "arguments": {"content": content}}
    })
}

fn query(id: i64, command: &str) -> Value {
    json!({
        "jsonrpc": "2.0", "id": id, "method": "tools/call",
        "params": {"name": "query_selector", "arguments": {"command": command}}
    })
}

#[tokio::test]
async fn fast_response_overtakes_slow_one() {
    let mut client = Client::start(ResponseOrder::Completion);

    client.send(ask(1, "slow question")).await;
    client.send(query(2, "#fast")).await;

    let first = client.next().await;
    let second = client.next().await;

    assert_eq!(first["id"], 2);
    assert_eq!(first["result"]["output"]["echo"]["command"], "#fast");
    assert_eq!(second["id"], 1);
    assert_eq!(second["result"]["status"], "completed");
    assert_eq!(second["result"]["output"]["content"], "answer to \"slow question\"");

    client.close().await;
}

#[tokio::test]
async fn arrival_order_holds_fast_response_back() {
    let mut client = Client::start(ResponseOrder::Arrival);

    client.send(ask(1, "slow question")).await;
    client.send(query(2, "#fast")).await;

    assert_eq!(client.next().await["id"], 1);
    assert_eq!(client.next().await["id"], 2);

    client.close().await;
}

#[tokio::test]
async fn every_line_gets_exactly_one_response() {
    let mut client = Client::start(ResponseOrder::Completion);

    client.send(json!({"jsonrpc": "2.0", "id": "a", "method": "tools/discover"})).await;
    client.send_raw("{not json").await;
    client.send_raw("").await;
    client
        .send(json!({"jsonrpc": "2.0", "id": "b", "method": "tools/call",
                     "params": {"name": "missing_tool", "arguments": {}}}))
        .await;
    client
        .send(json!({"jsonrpc": "2.0", "id": "c", "method": "tools/call",
                     "params": {"name": "get_selector_phrases", "arguments": {"source": "widget"}}}))
        .await;

    let mut responses = Vec::new();
    for _ in 0..4 {
        responses.push(client.next().await);
    }
    let mut output = client.close().await;
    assert!(output.next_line().await.unwrap().is_none(), "unexpected extra response");

    let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).cloned().unwrap();

    assert_eq!(by_id(json!("a"))["result"].as_array().unwrap().len(), 3);
    assert_eq!(by_id(Value::Null)["error"]["code"], -32700);
    assert_eq!(by_id(json!("b"))["error"]["code"], -32601);
    assert_eq!(
        by_id(json!("c"))["result"]["output"],
        json!([{"phrase": "top talkers", "source": "widget"}])
    );
}

#[tokio::test]
async fn closing_input_still_flushes_in_flight_responses() {
    let mut client = Client::start(ResponseOrder::Completion);

    client.send(ask(7, "last words")).await;
    let mut output = client.close().await;

    let line = output.next_line().await.unwrap().expect("response was dropped");
    let resp: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(resp["id"], 7);
    assert!(output.next_line().await.unwrap().is_none());
}

#[tokio::test]
async fn repeated_filtered_calls_are_identical() {
    let mut client = Client::start(ResponseOrder::Completion);
    let request = |id: i64| {
        json!({"jsonrpc": "2.0", "id": id, "method": "tools/call",
               "params": {"name": "get_selector_phrases", "arguments": {"source": "widget"}}})
    };

    client.send(request(1)).await;
    let first = client.next().await;
    client.send(request(2)).await;
    let second = client.next().await;

    assert_eq!(first["result"], second["result"]);
    client.close().await;
}

async fn oneshot(input: &str) -> Vec<Value> {
    let (server_out, mut output) = tokio::io::duplex(64 * 1024);
    let mut transport = StreamTransport::new(BufReader::new(input.as_bytes()), server_out);
    server(ResponseOrder::Completion)
        .run_oneshot(&mut transport)
        .await
        .unwrap();
    drop(transport);

    let mut text = String::new();
    output.read_to_string(&mut text).await.unwrap();
    text.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
}

#[tokio::test]
async fn oneshot_answers_only_the_last_request() {
    let input = format!(
        "{}\nsome log noise\n{}\n",
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
        query(2, "#devices")
    );

    let responses = oneshot(&input).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 2);
    assert_eq!(responses[0]["result"]["output"]["echo"]["command"], "#devices");
}

#[tokio::test]
async fn oneshot_without_json_is_parse_error() {
    let responses = oneshot("hello\nworld\n").await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
}

#[tokio::test]
async fn oneshot_with_invalid_last_object_is_parse_error() {
    let responses = oneshot("{\"id\": 1, \"method\": \"tools/list\"}\n{broken}\n").await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[0]["id"], Value::Null);
}

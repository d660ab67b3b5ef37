//! MCP (Model Context Protocol) front end for the Selector API.
//!
//! Reads line-delimited JSON-RPC 2.0 requests, routes `tools/*` methods to
//! the Selector tools, and writes one correlated response per request.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: Pluggable transport layer (stdio, channels)
//! - **server**: Request dispatcher plus the continuous and one-shot loops
//! - **error**: Unified error types and the JSON-RPC error code table
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use selector_core::SelectorConfig;
//! use selector_mcp::server::McpServer;
//! use selector_mcp::transport::StdioTransport;
//! use selector_tool_runtime::{HttpBackend, ToolRegistry};
//!
//! # async fn example() {
//! let config = SelectorConfig::new("https://selector.example.com", "api-key");
//! let backend = Arc::new(HttpBackend::new(config).unwrap());
//! let server = McpServer::new(ToolRegistry::selector(), backend);
//! let mut transport = StdioTransport::stdio();
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```

pub mod types;
pub mod transport;
pub mod server;
pub mod error;

pub use types::*;
pub use transport::{ChannelTransport, Inbound, McpTransport, MessageSink, StdioTransport, StreamTransport};
pub use server::{McpServer, ResponseOrder};
pub use error::McpError;

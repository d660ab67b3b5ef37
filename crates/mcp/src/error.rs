//! Error types for the MCP crate.

use crate::types::{error_codes, JsonRpcError};

/// Errors that can occur during MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Input line is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Valid JSON, but not a JSON-RPC request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested method is not supported.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters for a method.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The requested tool was not found in the registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Unexpected failure while dispatching an accepted request.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Fault outside dispatch (one-shot mode).
    #[error("Server error: {0}")]
    Server(String),

    /// Failed to serialize a message.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Transport I/O error.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl McpError {
    /// Convert to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            McpError::Parse(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => {
                error_codes::METHOD_NOT_FOUND
            }
            McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::Server(_) | McpError::Transport(_) => error_codes::SERVER_ERROR,
            McpError::Internal(_) | McpError::Serialize(_) => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table() {
        let cases = [
            (McpError::Parse("x".into()), -32700),
            (McpError::InvalidRequest("x".into()), -32600),
            (McpError::MethodNotFound("x".into()), -32601),
            (McpError::ToolNotFound("x".into()), -32601),
            (McpError::InvalidParams("x".into()), -32602),
            (McpError::Internal("x".into()), -32603),
            (McpError::Server("x".into()), -32000),
        ];
        for (err, code) in cases {
            assert_eq!(err.to_rpc_error().code, code, "{err}");
        }
    }

    #[test]
    fn test_message_carries_detail() {
        let err = McpError::ToolNotFound("bogus".to_string()).to_rpc_error();
        assert_eq!(err.message, "Tool not found: bogus");
    }
}

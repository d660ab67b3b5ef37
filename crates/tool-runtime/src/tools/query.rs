use serde::Deserialize;
use serde_json::json;

use crate::backend::{BackendRequest, Endpoint};
use crate::schema::{InputSchema, ParamSpec, ParamType};
use crate::tool::{ToolDescriptor, ToolKind};

pub const NAME: &str = "query_selector";

/// Run a structured Selector command and return the raw data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryArgs {
    pub command: String,
}

impl QueryArgs {
    pub fn backend_request(&self) -> BackendRequest {
        BackendRequest::Post {
            endpoint: Endpoint::Query,
            body: json!({ "command": self.command }),
        }
    }
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NAME.to_string(),
        description: "Get raw data back from Selector".to_string(),
        schema: InputSchema::new().param(
            ParamSpec::new("command", ParamType::String, true)
                .with_title("Command")
                .with_description("Selector query command, e.g. '#devices.status'"),
        ),
        kind: ToolKind::QuerySelector,
    }
}

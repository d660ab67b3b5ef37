use serde::Deserialize;
use serde_json::json;

use crate::backend::{BackendRequest, Endpoint};
use crate::schema::{InputSchema, ParamSpec, ParamType};
use crate::tool::{ToolDescriptor, ToolKind};

pub const NAME: &str = "ask_selector";

/// Ask Selector a question in natural language.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskArgs {
    pub content: String,
}

impl AskArgs {
    pub fn backend_request(&self) -> BackendRequest {
        BackendRequest::Post {
            endpoint: Endpoint::Chat,
            body: json!({ "content": self.content }),
        }
    }
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NAME.to_string(),
        description: "Ask Selector a question".to_string(),
        schema: InputSchema::new().param(
            ParamSpec::new("content", ParamType::String, true)
                .with_title("Question")
                .with_description("Natural-language question for the Selector copilot"),
        ),
        kind: ToolKind::AskSelector,
    }
}

use serde::Deserialize;

use crate::backend::{BackendRequest, Endpoint, FieldFilter};
use crate::schema::{InputSchema, ParamSpec, ParamType};
use crate::tool::{ToolDescriptor, ToolKind};

pub const NAME: &str = "get_selector_phrases";

/// Field of each phrase record matched against `source`.
pub const SOURCE_FIELD: &str = "source";

/// List Selector natural-language phrases, optionally restricted to one source.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PhrasesArgs {
    #[serde(default)]
    pub source: Option<String>,
}

impl PhrasesArgs {
    /// An empty `source` means no filter.
    pub fn backend_request(&self) -> BackendRequest {
        let filter = self
            .source
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| FieldFilter::new(SOURCE_FIELD, s));
        BackendRequest::Get {
            endpoint: Endpoint::Phrases,
            filter,
        }
    }
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NAME.to_string(),
        description: "Get the list of Selector Natural Language phrases, optionally filtered by source (e.g., user, widget, s2ml)".to_string(),
        schema: InputSchema::new().param(
            ParamSpec::new("source", ParamType::String, false)
                .with_title("Source")
                .with_description(
                    "Optional filter to return phrases from a specific source: user, widget, s2ml",
                ),
        ),
        kind: ToolKind::GetSelectorPhrases,
    }
}

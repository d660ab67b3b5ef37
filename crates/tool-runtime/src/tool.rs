use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::backend::{Backend, BackendRequest};
use crate::schema::InputSchema;
use crate::tools::{self, AskArgs, PhrasesArgs, QueryArgs};
use crate::validate::{ValidatedArguments, ValidationError};

/// The closed set of tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    AskSelector,
    QuerySelector,
    GetSelectorPhrases,
}

impl ToolKind {
    /// All kinds, in discovery order.
    pub const ALL: [ToolKind; 3] = [
        ToolKind::AskSelector,
        ToolKind::QuerySelector,
        ToolKind::GetSelectorPhrases,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::AskSelector => tools::ask::NAME,
            ToolKind::QuerySelector => tools::query::NAME,
            ToolKind::GetSelectorPhrases => tools::phrases::NAME,
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        match self {
            ToolKind::AskSelector => tools::ask::descriptor(),
            ToolKind::QuerySelector => tools::query::descriptor(),
            ToolKind::GetSelectorPhrases => tools::phrases::descriptor(),
        }
    }

    /// Turn validated arguments into this kind's typed call.
    pub fn bind(&self, args: ValidatedArguments) -> Result<ToolCall, ValidationError> {
        let value = args.into_value();
        let call = match self {
            ToolKind::AskSelector => ToolCall::AskSelector(from_value(value)?),
            ToolKind::QuerySelector => ToolCall::QuerySelector(from_value(value)?),
            ToolKind::GetSelectorPhrases => ToolCall::GetSelectorPhrases(from_value(value)?),
        };
        Ok(call)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// A registered tool: name, description, input schema and the kind that handles it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Unique tool name (e.g., "ask_selector")
    pub name: String,
    /// Human-readable description
    pub description: String,
    pub schema: InputSchema,
    pub kind: ToolKind,
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// A fully typed tool invocation, ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    AskSelector(AskArgs),
    QuerySelector(QueryArgs),
    GetSelectorPhrases(PhrasesArgs),
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::AskSelector(_) => ToolKind::AskSelector,
            ToolCall::QuerySelector(_) => ToolKind::QuerySelector,
            ToolCall::GetSelectorPhrases(_) => ToolKind::GetSelectorPhrases,
        }
    }

    pub fn backend_request(&self) -> BackendRequest {
        match self {
            ToolCall::AskSelector(args) => args.backend_request(),
            ToolCall::QuerySelector(args) => args.backend_request(),
            ToolCall::GetSelectorPhrases(args) => args.backend_request(),
        }
    }

    /// Run the call against `backend`. Never fails: errors come back as
    /// `ToolCallResult::Error`.
    pub async fn invoke(&self, backend: &dyn Backend) -> ToolCallResult {
        tracing::info!(tool = %self.kind(), "Invoking backend");
        backend.invoke(self.backend_request()).await
    }
}

/// Outcome of a tool call, serialized as `{"status": "completed", "output": ..}`
/// or `{"status": "error", "error": ".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolCallResult {
    Completed { output: Value },
    Error { error: String },
}

impl ToolCallResult {
    pub fn completed(output: Value) -> Self {
        ToolCallResult::Completed { output }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolCallResult::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolCallResult::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Endpoint;
    use crate::validate::validate;
    use serde_json::json;

    fn bind(kind: ToolKind, args: Value) -> Result<ToolCall, ValidationError> {
        let schema = kind.descriptor().schema;
        let validated = validate(&schema, args.as_object().unwrap())?;
        kind.bind(validated)
    }

    #[test]
    fn test_kind_names_are_stable() {
        let names: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["ask_selector", "query_selector", "get_selector_phrases"]);
        for kind in ToolKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
            assert_eq!(kind.descriptor().name, kind.name());
        }
    }

    #[test]
    fn test_bind_ask() {
        let call = bind(ToolKind::AskSelector, json!({"content": "how are my devices?"})).unwrap();
        assert_eq!(call.kind(), ToolKind::AskSelector);
        assert_eq!(
            call.backend_request(),
            BackendRequest::Post {
                endpoint: Endpoint::Chat,
                body: json!({"content": "how are my devices?"}),
            }
        );
    }

    #[test]
    fn test_bind_phrases_without_source() {
        let call = bind(ToolKind::GetSelectorPhrases, json!({})).unwrap();
        assert_eq!(
            call.backend_request(),
            BackendRequest::Get {
                endpoint: Endpoint::Phrases,
                filter: None,
            }
        );
    }

    #[test]
    fn test_bind_reports_missing_argument() {
        let err = bind(ToolKind::QuerySelector, json!({})).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequiredParameter("command".to_string()));
    }

    #[test]
    fn test_tool_call_result_wire_shape() {
        let ok = serde_json::to_value(ToolCallResult::completed(json!({"content": "hi"}))).unwrap();
        assert_eq!(ok, json!({"status": "completed", "output": {"content": "hi"}}));

        let err = serde_json::to_value(ToolCallResult::error("API error: 500")).unwrap();
        assert_eq!(err, json!({"status": "error", "error": "API error: 500"}));

        let parsed: ToolCallResult = serde_json::from_value(err).unwrap();
        assert!(parsed.is_error());
    }
}

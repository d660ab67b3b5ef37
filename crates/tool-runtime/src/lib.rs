pub mod tool;
pub mod tools;
pub mod schema;
pub mod validate;
pub mod registry;
pub mod backend;

pub use tool::{ToolCall, ToolCallResult, ToolDescriptor, ToolKind};
pub use schema::{InputSchema, ParamSpec, ParamType};
pub use validate::{validate, ValidatedArguments, ValidationError};
pub use registry::{RegistryError, ToolRegistry};
pub use backend::{Backend, BackendError, BackendRequest, Endpoint, FieldFilter, HttpBackend};
pub use tools::{AskArgs, PhrasesArgs, QueryArgs};

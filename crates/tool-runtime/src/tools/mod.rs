//! The Selector tools exposed over MCP.
//!
//! Each tool module owns its name, description, input schema, typed
//! arguments, and the backend request those arguments translate to.
//! - `ask_selector`: natural-language question to the chat endpoint
//! - `query_selector`: structured command to the query endpoint
//! - `get_selector_phrases`: phrase catalog, optionally filtered by source

pub mod ask;
pub mod query;
pub mod phrases;

pub use ask::AskArgs;
pub use query::QueryArgs;
pub use phrases::PhrasesArgs;

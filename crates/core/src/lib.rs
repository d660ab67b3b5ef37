pub mod config;
pub mod error;

pub use config::SelectorConfig;
pub use error::ConfigError;

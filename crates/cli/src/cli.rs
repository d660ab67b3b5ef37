use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use selector_mcp::ResponseOrder;

/// MCP server for the Selector AI API.
///
/// Speaks line-delimited JSON-RPC on stdin/stdout and forwards tool calls
/// to the Selector REST API. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "selector-mcp", version, about = "MCP stdio server for the Selector AI API")]
pub struct CliArgs {
    /// Read all of stdin, answer the last JSON request, then exit
    #[arg(long)]
    pub oneshot: bool,

    /// Write responses in request order instead of as soon as each is ready
    #[arg(long)]
    pub ordered: bool,

    /// Env file with SELECTOR_URL / SELECTOR_AI_API_KEY (default: ./.env if present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format (always written to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl CliArgs {
    pub fn response_order(&self) -> ResponseOrder {
        if self.ordered {
            ResponseOrder::Arrival
        } else {
            ResponseOrder::Completion
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["selector-mcp"]).unwrap();
        assert!(!args.oneshot);
        assert_eq!(args.response_order(), ResponseOrder::Completion);
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_oneshot_and_ordered() {
        let args = CliArgs::try_parse_from([
            "selector-mcp",
            "--oneshot",
            "--ordered",
            "--log-format",
            "json",
            "--env-file",
            "/tmp/selector.env",
        ])
        .unwrap();
        assert!(args.oneshot);
        assert_eq!(args.response_order(), ResponseOrder::Arrival);
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.env_file, Some(PathBuf::from("/tmp/selector.env")));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(CliArgs::try_parse_from(["selector-mcp", "--bogus"]).is_err());
    }
}

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use selector_core::config::{load_dotenv, load_env_file};
use selector_core::SelectorConfig;
use selector_mcp::{McpServer, StdioTransport};
use selector_tool_runtime::{HttpBackend, ToolRegistry};

use crate::cli::{CliArgs, LogFormat};

fn init_tracing(args: &CliArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries the protocol; logs must stay on stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args);

    match args.env_file {
        Some(ref path) => load_env_file(path).context("failed to load env file")?,
        None => load_dotenv(),
    }

    let config = SelectorConfig::from_env().context("failed to load configuration")?;
    config.log_summary();

    let backend = HttpBackend::new(config).context("failed to create Selector client")?;
    let server = McpServer::new(ToolRegistry::selector(), Arc::new(backend))
        .with_order(args.response_order());
    let mut transport = StdioTransport::stdio();

    if args.oneshot {
        info!("Starting server (one-shot)");
        server
            .run_oneshot(&mut transport)
            .await
            .context("one-shot request failed")?;
        return Ok(());
    }

    info!("Starting server");
    tokio::select! {
        result = server.run(&mut transport) => {
            result.context("server loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            // The blocking stdin reader would otherwise hold up runtime shutdown.
            std::process::exit(0);
        }
    }

    Ok(())
}

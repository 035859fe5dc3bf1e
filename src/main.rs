//! MCP bridge - main entry point.
//!
//! Connects to a remote tool server's call API and re-exposes its catalog
//! as MCP tools over stdin/stdout.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use toolserver_core::mcp::{stdio, HttpToolClient, ToolBridge};
use toolserver_core::Config;

#[derive(Parser, Debug)]
#[command(name = "toolserver-bridge")]
#[command(about = "Expose a remote tool server as MCP tools over stdio")]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the remote call API
    #[arg(long, env = "TOOLSERVER_REMOTE_URL")]
    url: Option<String>,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Only expose these tool names (repeatable)
    #[arg(long = "tool")]
    tools: Vec<String>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration, then let flags win
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.bridge.remote_url = url;
    }
    config.bridge.headers.extend(args.headers);
    if !args.tools.is_empty() {
        config.bridge.allowed_tools = args.tools;
    }

    toolserver_core::observability::init_tracing_from(&config.observability);
    tracing::info!("MCP bridge connecting to {}", config.bridge.remote_url);

    let client = HttpToolClient::from_config(&config.bridge)?;
    let bridge = ToolBridge::connect(Arc::new(client), &config.bridge.allowed_tools).await?;
    let bridge = Arc::new(bridge);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = stdio::serve(bridge, stdin, stdout) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }

    Ok(())
}

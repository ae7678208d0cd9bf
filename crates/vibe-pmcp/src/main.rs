//! VibePMCP bridge binary
//!
//! # Usage
//!
//! ```bash
//! # Multi-session HTTP endpoint on http://localhost:3456/mcp
//! vibe-pmcp
//!
//! # Single session over stdin/stdout
//! vibe-pmcp --transport stdio
//!
//! # Custom backend
//! VIBE_SERVER_URL=http://backend:3000 REQUEST_TIMEOUT=10000 vibe-pmcp --port 4000
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vibe_pmcp::config::{SERVER_NAME, SERVER_VERSION};
use vibe_pmcp::{http, stdio, Args, BridgeConfig, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::from_args(Args::parse());

    // stderr only: in stdio mode stdout is the protocol stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        name = SERVER_NAME,
        version = SERVER_VERSION,
        transport = ?config.transport,
        backend = %config.proxy.server_url,
        "Starting bridge"
    );

    match config.transport {
        Transport::Http => http::serve(&config).await,
        Transport::Stdio => stdio::serve(&config).await,
    }
}

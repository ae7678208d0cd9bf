//! stdio transport
//!
//! A single session served by rmcp over stdin/stdout. Logging goes to
//! stderr, so stdout carries protocol bytes only.

use crate::config::{BridgeConfig, SERVER_NAME};
use crate::mcp::McpServer;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use tokio::io::{stdin, stdout, AsyncRead, AsyncWrite};
use tracing::info;

/// Initialize the adapter, then serve stdin/stdout until EOF.
pub async fn serve(config: &BridgeConfig) -> Result<()> {
    let server = McpServer::connect(&config.proxy)
        .await
        .context("failed to initialize the proxy adapter")?;

    info!(
        backend = %config.proxy.server_url,
        "{} serving on stdio",
        SERVER_NAME
    );

    run(server, stdin(), stdout()).await?;

    info!("stdin closed, shutting down");
    Ok(())
}

/// Serve `server` over `reader`/`writer` until the peer disconnects.
pub async fn run<R, W>(server: McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let service = server
        .serve((reader, writer))
        .await
        .context("MCP handshake failed")?;
    service.waiting().await?;
    Ok(())
}

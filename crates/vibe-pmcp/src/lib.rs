//! VibePMCP
//!
//! Exposes a remote command-execution backend as an MCP server. Every client
//! session gets its own [`vibe_proxy::ProxyAdapter`], so project state never
//! leaks between sessions.
//!
//! - [`session`]: identifier to session map, one adapter per session
//! - [`mcp`]: the rmcp `ServerHandler` serving one session
//! - [`protocol`]: envelope checks the HTTP bridge does before forwarding
//! - [`tools`]: typed tools plus generic tools for discovered commands
//! - [`http`] / [`stdio`]: the two transports

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod protocol;
pub mod session;
pub mod stdio;
pub mod tools;

pub use config::{Args, BridgeConfig, Transport};
pub use error::{BridgeError, BridgeResult};
pub use mcp::McpServer;
pub use session::{Session, SessionRegistry};
pub use tools::ToolRegistry;

//! Process configuration
//!
//! Environment variables provide the defaults; command-line flags override
//! them.

use clap::{Parser, ValueEnum};
use std::time::Duration;
use vibe_proxy::ProxyConfig;

/// Name reported in `initialize` replies and by `/status`
pub const SERVER_NAME: &str = "VibePMCP";

/// Version reported in `initialize` replies and by `/status`
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3456;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Which external transport carries the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Transport {
    /// Multi-session HTTP endpoint on `/mcp`
    #[default]
    Http,
    /// Single session over newline-delimited stdin/stdout
    Stdio,
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "vibe-pmcp", author, version, about, long_about = None)]
pub struct Args {
    /// Transport to serve on
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,

    /// HTTP listen host (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP listen port (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Command backend base URL (overrides VIBE_SERVER_URL)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Per-request backend timeout in milliseconds (overrides REQUEST_TIMEOUT)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Fully resolved bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Settings handed to every session's adapter
    pub proxy: ProxyConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            log_level: std::env::var("LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            proxy: ProxyConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Environment defaults with command-line overrides applied.
    pub fn from_args(args: Args) -> Self {
        Self::default().with_args(args)
    }

    pub fn with_args(mut self, args: Args) -> Self {
        if let Some(transport) = args.transport {
            self.transport = transport;
        }
        if let Some(host) = args.host {
            self.host = host;
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(url) = args.server_url {
            self.proxy.server_url = url;
        }
        if let Some(ms) = args.timeout_ms {
            self.proxy.timeout = Duration::from_millis(ms);
        }
        self
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_proxy::config::{DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_MS};

    /// Defaults without consulting the environment.
    fn fixed_defaults() -> BridgeConfig {
        BridgeConfig {
            transport: Transport::Http,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            proxy: ProxyConfig::new(DEFAULT_SERVER_URL, Duration::from_millis(DEFAULT_TIMEOUT_MS)),
        }
    }

    #[test]
    fn test_args_override_defaults() {
        let args = Args::parse_from([
            "vibe-pmcp",
            "--transport",
            "stdio",
            "--port",
            "4000",
            "--server-url",
            "http://backend:9000",
            "--timeout-ms",
            "1500",
        ]);
        let config = fixed_defaults().with_args(args);

        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.proxy.server_url, "http://backend:9000");
        assert_eq!(config.proxy.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_no_args_keeps_defaults() {
        let config = fixed_defaults().with_args(Args::parse_from(["vibe-pmcp"]));

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.listen_addr(), "localhost:3456");
        assert_eq!(config.proxy.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_rejects_unknown_transport() {
        assert!(Args::try_parse_from(["vibe-pmcp", "--transport", "ws"]).is_err());
    }
}

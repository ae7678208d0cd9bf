use std::time::Duration;

/// Default backend base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default per-request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Backend connection settings shared by the client, discovery, and adapter.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the command backend (no trailing slash required)
    pub server_url: String,
    /// Timeout applied to every backend call
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server_url: std::env::var("VIBE_SERVER_URL")
                .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string()),
            timeout: Duration::from_millis(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        }
    }
}

impl ProxyConfig {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server_url: server_url.into(),
            timeout,
        }
    }

    /// Base URL without a trailing slash, so paths can be appended directly.
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

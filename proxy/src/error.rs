//! Proxy error types
//!
//! Contract violations and transport failures are errors. A backend that
//! answers with `success: false` is not: the adapter folds that into its
//! text result instead (see [`crate::format`]).

use thiserror::Error;

/// Result type alias for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors that can occur while talking to the command backend
#[derive(Error, Debug)]
pub enum ProxyError {
    /// An operation was invoked before `initialize()` completed
    #[error("{component} not initialized. Call initialize() first.")]
    NotInitialized { component: &'static str },

    /// Metadata was requested for a command absent from the discovery cache
    #[error("Command '{name}' not found on server.")]
    UnknownCommand { name: String },

    /// Transport-level failure: timeout, refused connection, unparseable reply
    #[error("Remote communication error: {message}")]
    RemoteCommunication { message: String },

    /// The command list could not be fetched
    #[error("Command discovery failed: {message}")]
    Discovery { message: String },

    /// A metadata endpoint answered with `success: false`
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Invalid client configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ProxyError {
    /// Create a not-initialized error for the named component
    pub fn not_initialized(component: &'static str) -> Self {
        Self::NotInitialized { component }
    }

    /// Create an unknown command error
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Create a remote communication error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteCommunication {
            message: message.into(),
        }
    }

    /// Create a discovery error
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized { .. } => "NOT_INITIALIZED",
            Self::UnknownCommand { .. } => "UNKNOWN_COMMAND",
            Self::RemoteCommunication { .. } => "REMOTE_COMMUNICATION",
            Self::Discovery { .. } => "DISCOVERY_FAILED",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::remote(format!("request timed out: {}", err))
        } else {
            Self::remote(err.to_string())
        }
    }
}

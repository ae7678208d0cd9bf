//! Bridge error types
//!
//! Every error that escapes a tool or resource handler becomes an rmcp
//! [`ErrorData`]; [`BridgeError::rpc_code`] picks the code. Proxy failures
//! also carry their machine-readable code in `error.data.code`.

use rmcp::model::ErrorCode;
use rmcp::ErrorData;
use serde_json::json;
use thiserror::Error;
use vibe_proxy::ProxyError;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while serving one protocol message
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Adapter, discovery, or transport failure from the proxy layer
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// Tool arguments or method params did not match the expected shape
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    /// `tools/call` named a tool this session does not expose
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// `resources/read` on a URI no template matches
    #[error("Resource not found: {uri}")]
    InvalidResourceUri { uri: String },

    /// The session's protocol service stopped or did not answer
    #[error("Session transport error: {message}")]
    Transport { message: String },
}

impl BridgeError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn invalid_resource_uri(uri: impl Into<String>) -> Self {
        Self::InvalidResourceUri { uri: uri.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// JSON-RPC error code for this error
    pub fn rpc_code(&self) -> ErrorCode {
        match self {
            Self::Proxy(_) | Self::Transport { .. } => ErrorCode::INTERNAL_ERROR,
            Self::InvalidParams { .. }
            | Self::UnknownTool { .. }
            | Self::InvalidResourceUri { .. } => ErrorCode::INVALID_PARAMS,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_params(err.to_string())
    }
}

impl From<BridgeError> for ErrorData {
    fn from(err: BridgeError) -> Self {
        let data = match &err {
            BridgeError::Proxy(proxy) => Some(json!({ "code": proxy.code() })),
            _ => None,
        };
        ErrorData::new(err.rpc_code(), err.to_string(), data)
    }
}

//! Wire types exchanged with the command backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command reported by the backend's discovery endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Unique, case-sensitive command name
    pub name: String,
    /// Backend-internal handler reference; carried but never interpreted
    #[serde(default)]
    pub handler: Value,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: Value::Null,
        }
    }
}

/// Body of `GET /api/mcp/commands`. The `commands` array is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandList {
    pub commands: Vec<Command>,
}

/// Body of `POST /api/mcp/execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub command: &'a str,
}

/// The `{ success, result?, error? }` envelope every execute call returns.
///
/// Missing fields default so that a bare `{ "error": "..." }` body still
/// decodes as a failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    /// The backend's error message, or a generic fallback.
    pub fn error_message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or("unknown error")
    }

    /// The result payload, treating an explicit JSON `null` as absent.
    pub fn payload(&self) -> Option<&Value> {
        self.result.as_ref().filter(|v| !v.is_null())
    }
}

/// One entry of the `list-projects` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "isActive")]
    pub is_active: bool,
}

/// One entry of the `list-files` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    #[serde(alias = "path")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "isDirectory")]
    pub is_directory: Option<bool>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.is_directory.unwrap_or(false)
            || matches!(self.kind.as_deref(), Some("directory") | Some("dir"))
    }
}

/// Body of `POST /api/mcp-api/complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub prefix: &'a str,
}

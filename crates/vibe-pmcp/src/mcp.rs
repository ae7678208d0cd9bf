//! Per-session MCP server
//!
//! [`McpServer`] is the rmcp [`ServerHandler`] for one session: it owns that
//! session's [`ProxyAdapter`] and [`ToolRegistry`]. rmcp runs the protocol
//! (handshake, `ping`, method routing); the handler answers:
//!
//! | Method | Reply |
//! |--------|-------|
//! | `tools/list` | fixed and generic tools |
//! | `tools/call` | adapter text as a single text content block |
//! | `resources/list` | empty (only templated resources are served) |
//! | `resources/templates/list` | `project://{projectName}/{filePath}` |
//! | `resources/read` | file content via `get_project_file` |

use crate::config::{SERVER_NAME, SERVER_VERSION};
use crate::error::{BridgeError, BridgeResult};
use crate::tools::ToolRegistry;
use regex::Regex;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
    ListToolsResult, PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use vibe_proxy::{ProxyAdapter, ProxyConfig};

pub const PROJECT_FILE_TEMPLATE: &str = "project://{projectName}/{filePath}";

const INSTRUCTIONS: &str = "Bridge to a remote command backend.\n\
    - create-project / switch-project select the project that file tools act on\n\
    - describe-command and complete-command explain the backend's own commands\n\
    - every other discovered command is a tool taking one optional `args` string\n\
    - project files are also readable as project://{projectName}/{filePath}";

static PROJECT_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^project://([^/]+)/(.+)$").expect("PROJECT_URI regex should compile")
});

/// Protocol handler bound to one adapter.
#[derive(Debug, Clone)]
pub struct McpServer {
    adapter: Arc<ProxyAdapter>,
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(adapter: Arc<ProxyAdapter>, tools: ToolRegistry) -> Self {
        Self {
            adapter,
            tools: Arc::new(tools),
        }
    }

    /// Build an adapter, initialize it, and register tools for the
    /// discovered commands.
    ///
    /// Fails if discovery fails; no server exists in that case.
    pub async fn connect(config: &ProxyConfig) -> BridgeResult<Self> {
        let adapter = Arc::new(ProxyAdapter::new(config)?);
        adapter.initialize().await?;

        let commands = adapter.available_commands().await?;
        let tools = ToolRegistry::for_commands(&commands);
        info!(
            commands = commands.len(),
            tools = tools.len(),
            "Protocol server connected"
        );

        Ok(Self::new(adapter, tools))
    }

    pub fn adapter(&self) -> &Arc<ProxyAdapter> {
        &self.adapter
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one tool and return its text.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> BridgeResult<String> {
        debug!(tool = name, "Calling tool");
        self.tools
            .call(name, Arc::clone(&self.adapter), arguments)
            .await
    }

    /// Read a `project://<project>/<path>` resource.
    pub async fn read_project_file(&self, uri: &str) -> BridgeResult<String> {
        let (project, path) =
            parse_project_uri(uri).ok_or_else(|| BridgeError::invalid_resource_uri(uri))?;
        debug!(project, path, "Reading project file resource");

        Ok(self.adapter.get_project_file(project, path).await?)
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Implementation::from_build_env()
            },
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        from_wire(json!({ "tools": self.tools.list() }))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.map(Value::Object);
        match self.call(&request.name, arguments).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                warn!(tool = %request.name, error = %e, "Tool call failed");
                Err(e.into())
            }
        }
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        from_wire(json!({
            "resourceTemplates": [{
                "uriTemplate": PROJECT_FILE_TEMPLATE,
                "name": "project-files",
                "description": "Files of a project, read through the command backend",
                "mimeType": "text/plain",
            }]
        }))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let text = self.read_project_file(&request.uri).await.map_err(|e| {
            warn!(uri = %request.uri, error = %e, "Resource read failed");
            ErrorData::from(e)
        })?;

        from_wire(json!({
            "contents": [{
                "uri": request.uri,
                "mimeType": "text/plain",
                "text": text,
            }]
        }))
    }
}

/// Decode a result built in its wire shape into the rmcp model type.
fn from_wire<T: DeserializeOwned>(value: Value) -> Result<T, ErrorData> {
    serde_json::from_value(value).map_err(|e| ErrorData::internal_error(e.to_string(), None))
}

/// Split `project://<project>/<path>` into its two parts.
pub fn parse_project_uri(uri: &str) -> Option<(&str, &str)> {
    let caps = PROJECT_URI.captures(uri)?;
    let project = caps.get(1)?.as_str();
    let path = caps.get(2)?.as_str();
    Some((project, path))
}

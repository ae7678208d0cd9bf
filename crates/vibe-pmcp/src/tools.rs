//! Tool registry
//!
//! Each session exposes two kinds of tools:
//!
//! - **Fixed tools** with typed arguments, one per adapter operation
//!   (`create-project`, `read-file`, `edit`, ...). Input schemas are generated
//!   from the argument structs with `schemars`.
//! - **Generic tools**, one per discovered backend command that has no fixed
//!   counterpart. They take a single optional `args` string and forward
//!   `"<name> <args>"` to `execute_command`.
//!
//! Handlers are stored as boxed closures keyed by tool name, built once when
//! the session opens.

use crate::error::{BridgeError, BridgeResult};
use futures::future::{BoxFuture, FutureExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use vibe_proxy::{ProxyAdapter, ProxyResult};

pub type ToolHandler =
    Arc<dyn Fn(Arc<ProxyAdapter>, Value) -> BoxFuture<'static, BridgeResult<String>> + Send + Sync>;

/// A callable tool as advertised by `tools/list`.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    handler: ToolHandler,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    /// Entry for a `tools/list` reply.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

// ============================================================================
// Tool argument types
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateProjectArgs {
    #[schemars(description = "Name of the new project")]
    pub name: String,
    #[schemars(description = "Optional: short description of the project")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectNameArgs {
    #[schemars(description = "Name of an existing project")]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFileArgs {
    #[schemars(description = "File path relative to the project root")]
    pub path: String,
    #[schemars(description = "Optional: initial file content")]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    #[schemars(description = "Optional: directory to list (defaults to the project root)")]
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FilePathArgs {
    #[schemars(description = "File path relative to the project root")]
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateFileArgs {
    #[schemars(description = "File path relative to the project root")]
    pub path: String,
    #[schemars(description = "New file content, replacing the old one")]
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditArgs {
    #[schemars(description = "File path relative to the project root")]
    pub path: String,
    #[serde(rename = "lineRange")]
    #[schemars(description = "Lines to replace as <start>-<end>, e.g. 3-10")]
    pub line_range: String,
    #[schemars(description = "Optional: replacement text for the line range")]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeCommandArgs {
    #[schemars(description = "Name of a discovered backend command")]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompleteCommandArgs {
    #[schemars(description = "Beginning of a command name")]
    pub prefix: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenericArgs {
    #[schemars(description = "Optional: argument string appended to the command name")]
    pub args: Option<String>,
}

// ============================================================================
// Registry
// ============================================================================

/// Name-keyed set of tools exposed by one session.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed tools plus a generic tool for every discovered command without
    /// a fixed counterpart.
    pub fn for_commands(commands: &[String]) -> Self {
        let mut registry = Self::with_fixed_tools();
        for name in commands {
            if registry.contains(name) {
                debug!(tool = %name, "Discovered command covered by a typed tool");
                continue;
            }
            registry.register(generic_tool(name));
        }
        registry
    }

    /// Registry holding only the typed tools.
    pub fn with_fixed_tools() -> Self {
        let mut registry = Self::new();

        registry.register(typed(
            "create-project",
            "Create a new project and make it the active project",
            |adapter, args: CreateProjectArgs| async move {
                adapter
                    .create_project(&args.name, args.description.as_deref().unwrap_or_default())
                    .await
            },
        ));
        registry.register(typed(
            "list-projects",
            "List all projects, marking the active one",
            |adapter, _: NoArgs| async move { adapter.list_projects().await },
        ));
        registry.register(typed(
            "switch-project",
            "Make an existing project the active project",
            |adapter, args: ProjectNameArgs| async move { adapter.switch_project(&args.name).await },
        ));
        registry.register(typed(
            "create-file",
            "Create a file in the active project",
            |adapter, args: CreateFileArgs| async move {
                adapter
                    .create_file(&args.path, args.content.as_deref().unwrap_or_default())
                    .await
            },
        ));
        registry.register(typed(
            "list-files",
            "List files of the active project",
            |adapter, args: ListFilesArgs| async move {
                adapter
                    .list_files(args.directory.as_deref().unwrap_or_default())
                    .await
            },
        ));
        registry.register(typed(
            "read-file",
            "Read a file of the active project",
            |adapter, args: FilePathArgs| async move { adapter.read_file(&args.path).await },
        ));
        registry.register(typed(
            "update-file",
            "Replace the content of a file in the active project",
            |adapter, args: UpdateFileArgs| async move {
                adapter.update_file(&args.path, &args.content).await
            },
        ));
        registry.register(typed(
            "delete-file",
            "Delete a file from the active project",
            |adapter, args: FilePathArgs| async move { adapter.delete_file(&args.path).await },
        ));
        registry.register(typed(
            "edit",
            "Replace a range of lines in a file of the active project",
            |adapter, args: EditArgs| async move {
                adapter
                    .edit_file(
                        &args.path,
                        &args.line_range,
                        args.content.as_deref().unwrap_or_default(),
                    )
                    .await
            },
        ));
        registry.register(typed(
            "help",
            "Show the backend's help text",
            |adapter, _: NoArgs| async move { adapter.help().await },
        ));
        registry.register(typed(
            "describe-command",
            "Show the schema and usage examples of a backend command",
            |adapter, args: DescribeCommandArgs| async move {
                adapter.describe_command(&args.name).await
            },
        ));
        registry.register(typed(
            "complete-command",
            "Suggest backend commands starting with a prefix",
            |adapter, args: CompleteCommandArgs| async move {
                adapter.complete_command(&args.prefix).await
            },
        ));

        registry
    }

    /// Add or replace a tool.
    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `tools/list` entries, sorted by name.
    pub fn list(&self) -> Vec<Value> {
        self.tools.values().map(ToolDefinition::to_json).collect()
    }

    /// Run a tool. Missing or `null` arguments are treated as `{}`.
    pub async fn call(
        &self,
        name: &str,
        adapter: Arc<ProxyAdapter>,
        arguments: Option<Value>,
    ) -> BridgeResult<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| BridgeError::unknown_tool(name))?;

        let arguments = match arguments {
            None | Some(Value::Null) => json!({}),
            Some(value) => value,
        };
        (tool.handler)(adapter, arguments).await
    }
}

/// Build a tool whose arguments deserialize into `A`.
pub fn typed<A, F, Fut>(name: &str, description: &str, f: F) -> ToolDefinition
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(Arc<ProxyAdapter>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProxyResult<String>> + Send + 'static,
{
    let f = Arc::new(f);
    let handler: ToolHandler = Arc::new(move |adapter: Arc<ProxyAdapter>, arguments: Value| {
        let f = Arc::clone(&f);
        async move {
            let args: A = serde_json::from_value(arguments).map_err(BridgeError::from)?;
            f(adapter, args).await.map_err(BridgeError::from)
        }
        .boxed()
    });

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: schema_of::<A>(),
        handler,
    }
}

/// Free-text tool forwarding to `execute_command`.
pub fn generic_tool(name: &str) -> ToolDefinition {
    let command = name.to_string();
    let description = format!("Run the backend command '{}'", name);
    typed(name, &description, move |adapter, args: GenericArgs| {
        let raw = generic_command(&command, args.args.as_deref());
        async move { adapter.execute_command(&raw).await }
    })
}

/// `"<name> <args>"`, or just `name` when there are no arguments.
pub fn generic_command(name: &str, args: Option<&str>) -> String {
    match args.map(str::trim).filter(|a| !a.is_empty()) {
        Some(args) => format!("{} {}", name, args),
        None => name.to_string(),
    }
}

fn schema_of<A: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(A))
        .unwrap_or_else(|_| json!({ "type": "object" }));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
        map.entry("properties").or_insert_with(|| json!({}));
    }
    schema
}

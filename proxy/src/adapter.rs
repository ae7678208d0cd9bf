//! Proxy adapter
//!
//! Stateful facade over the command backend. Each domain operation becomes
//! one `POST /api/mcp/execute` call (two for `get_project_file` when it has
//! to switch projects first) and comes back as display text.
//!
//! The adapter tracks one piece of session state, the current project.
//! Only a successful create or switch changes it, and every file operation
//! checks it before touching the network.

use crate::client::RemoteClient;
use crate::config::ProxyConfig;
use crate::discovery::CommandDiscovery;
use crate::error::{ProxyError, ProxyResult};
use crate::format;
use crate::types::{Envelope, ExecuteRequest};
use regex::Regex;
use std::sync::LazyLock;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const EXECUTE_PATH: &str = "/api/mcp/execute";

static LINE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("LINE_RANGE regex should compile"));

/// Per-session mutable state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterState {
    /// Set by `initialize()`; every other operation requires it
    pub ready: bool,
    /// Project selected by the last successful create or switch
    pub current_project: Option<String>,
}

/// Stateful translator from domain operations to backend commands.
#[derive(Debug)]
pub struct ProxyAdapter {
    client: RemoteClient,
    discovery: CommandDiscovery,
    state: RwLock<AdapterState>,
}

impl ProxyAdapter {
    /// Create an adapter in the *constructed* state.
    pub fn new(config: &ProxyConfig) -> ProxyResult<Self> {
        let client = RemoteClient::new(config)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: RemoteClient) -> Self {
        Self {
            discovery: CommandDiscovery::new(client.clone()),
            client,
            state: RwLock::new(AdapterState::default()),
        }
    }

    /// Run command discovery and move to *ready*.
    ///
    /// Fail-fast: on error the adapter stays *constructed*.
    pub async fn initialize(&self) -> ProxyResult<()> {
        self.discovery.initialize().await?;
        self.state.write().await.ready = true;
        info!(backend = self.client.base_url(), "Proxy adapter ready");
        Ok(())
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    /// Snapshot of the adapter state.
    pub async fn state(&self) -> AdapterState {
        self.state.read().await.clone()
    }

    pub async fn current_project(&self) -> Option<String> {
        self.state.read().await.current_project.clone()
    }

    pub fn discovery(&self) -> &CommandDiscovery {
        &self.discovery
    }

    // ------------------------------------------------------------------
    // Generic execution
    // ------------------------------------------------------------------

    /// Send `raw` as-is to the execute endpoint and render the envelope.
    ///
    /// A backend-reported failure is returned as `Error: ...` text. Only
    /// transport failures and contract violations are `Err`.
    pub async fn execute_command(&self, raw: &str) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let name = raw.split_whitespace().next().unwrap_or_default();
        if !self.discovery.has_command(name).await? {
            warn!(command = name, "Forwarding command not reported by discovery");
        }

        let envelope = self.dispatch(raw).await?;
        Ok(format::command_text(&envelope))
    }

    /// Names of all discovered commands, in backend order.
    pub async fn available_commands(&self) -> ProxyResult<Vec<String>> {
        self.ensure_ready().await?;
        let commands = self.discovery.all_commands().await?;
        Ok(commands.into_iter().map(|c| c.name).collect())
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub async fn create_project(&self, name: &str, description: &str) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let envelope = self
            .dispatch(&join_command(&["create-project", name, description]))
            .await?;
        if !envelope.success {
            return Ok(format::error_text(Some("creating project"), &envelope));
        }

        self.set_current_project(name).await;
        Ok(format!("Project '{}' created successfully", name))
    }

    pub async fn list_projects(&self) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let envelope = self.dispatch("list-projects").await?;
        if !envelope.success {
            return Ok(format::error_text(Some("listing projects"), &envelope));
        }

        let listing = envelope.payload().and_then(format::project_listing);
        Ok(listing.unwrap_or_else(|| {
            "Error listing projects: backend returned no project list".to_string()
        }))
    }

    pub async fn switch_project(&self, name: &str) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let envelope = self
            .dispatch(&join_command(&["switch-project", name]))
            .await?;
        if !envelope.success {
            return Ok(format::error_text(Some("switching project"), &envelope));
        }

        self.set_current_project(name).await;
        Ok(format!("Project '{}' selected successfully", name))
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    pub async fn create_file(&self, path: &str, content: &str) -> ProxyResult<String> {
        if let Some(refusal) = self.require_project().await? {
            return Ok(refusal);
        }

        let envelope = self
            .dispatch(&join_command(&["create-file", path, content]))
            .await?;
        if !envelope.success {
            return Ok(format::error_text(Some("creating file"), &envelope));
        }
        Ok(format!("File '{}' created successfully", path))
    }

    pub async fn read_file(&self, path: &str) -> ProxyResult<String> {
        if let Some(refusal) = self.require_project().await? {
            return Ok(refusal);
        }

        let envelope = self.dispatch(&join_command(&["read-file", path])).await?;
        if !envelope.success {
            return Ok(format::error_text(Some("reading file"), &envelope));
        }

        Ok(match envelope.payload() {
            Some(payload) => format::file_content(payload),
            None => format!("Error: unable to read file {}", path),
        })
    }

    pub async fn update_file(&self, path: &str, content: &str) -> ProxyResult<String> {
        if let Some(refusal) = self.require_project().await? {
            return Ok(refusal);
        }

        let envelope = self
            .dispatch(&join_command(&["update-file", path, content]))
            .await?;
        if !envelope.success {
            return Ok(format::error_text(Some("updating file"), &envelope));
        }
        Ok(format!("File '{}' updated successfully", path))
    }

    pub async fn delete_file(&self, path: &str) -> ProxyResult<String> {
        if let Some(refusal) = self.require_project().await? {
            return Ok(refusal);
        }

        let envelope = self.dispatch(&join_command(&["delete-file", path])).await?;
        if !envelope.success {
            return Ok(format::error_text(Some("deleting file"), &envelope));
        }
        Ok(format!("File '{}' deleted successfully", path))
    }

    /// Replace lines `<start>-<end>` of `path` with `content`.
    pub async fn edit_file(
        &self,
        path: &str,
        line_range: &str,
        content: &str,
    ) -> ProxyResult<String> {
        if let Some(refusal) = self.require_project().await? {
            return Ok(refusal);
        }

        let Some((start, end)) = parse_line_range(line_range) else {
            return Ok(format!(
                "Error: invalid line range '{}'. Expected <start>-<end>, e.g. 3-10",
                line_range
            ));
        };

        let range = format!("{}-{}", start, end);
        let envelope = self
            .dispatch(&join_command(&["edit", path, &range, content]))
            .await?;
        if !envelope.success {
            return Ok(format::error_text(Some("editing file"), &envelope));
        }
        Ok(format!(
            "Lines {}-{} of '{}' modified successfully",
            start, end, path
        ))
    }

    pub async fn list_files(&self, directory: &str) -> ProxyResult<String> {
        if let Some(refusal) = self.require_project().await? {
            return Ok(refusal);
        }

        let envelope = self
            .dispatch(&join_command(&["list-files", directory]))
            .await?;
        if !envelope.success {
            return Ok(format::error_text(Some("listing files"), &envelope));
        }

        let listing = envelope
            .payload()
            .and_then(|payload| format::file_listing(directory, payload));
        Ok(listing
            .unwrap_or_else(|| "Error listing files: backend returned no file list".to_string()))
    }

    /// Read `path` from `project`, switching to it first if needed.
    ///
    /// The switch is observable: afterwards the current project is `project`
    /// (unless the switch itself failed, whose error text is returned).
    pub async fn get_project_file(&self, project: &str, path: &str) -> ProxyResult<String> {
        self.ensure_ready().await?;

        if self.current_project().await.as_deref() != Some(project) {
            debug!(project, "Implicit project switch before read");
            let switched = self.switch_project(project).await?;
            if self.current_project().await.as_deref() != Some(project) {
                return Ok(switched);
            }
        }

        self.read_file(path).await
    }

    // ------------------------------------------------------------------
    // Help and command metadata
    // ------------------------------------------------------------------

    pub async fn help(&self) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let envelope = self.dispatch("help").await?;
        if !envelope.success {
            return Ok(format::error_text(Some("retrieving help"), &envelope));
        }
        Ok(format::command_text(&envelope))
    }

    /// Schema and usage examples of one discovered command.
    pub async fn describe_command(&self, name: &str) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let schema = self.discovery.command_schema(name).await?;
        let examples = self.discovery.command_examples(name).await?;

        let mut text = format!(
            "Command '{}'\n\nSchema:\n{}",
            name,
            format::payload_text(&schema)
        );
        if !examples.is_empty() {
            text.push_str("\n\nExamples:\n");
            let lines: Vec<String> = examples.iter().map(|e| format!("- {}", e)).collect();
            text.push_str(&lines.join("\n"));
        }
        Ok(text)
    }

    pub async fn complete_command(&self, prefix: &str) -> ProxyResult<String> {
        self.ensure_ready().await?;

        let suggestions = self.discovery.completion_suggestions(prefix).await?;
        Ok(format::suggestion_listing(prefix, &suggestions))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn ensure_ready(&self) -> ProxyResult<()> {
        if self.state.read().await.ready {
            Ok(())
        } else {
            Err(ProxyError::not_initialized("ProxyAdapter"))
        }
    }

    /// Readiness check plus the active-project gate shared by file operations.
    ///
    /// `Ok(Some(text))` is the user-visible refusal.
    async fn require_project(&self) -> ProxyResult<Option<String>> {
        let state = self.state.read().await;
        if !state.ready {
            return Err(ProxyError::not_initialized("ProxyAdapter"));
        }
        Ok(match state.current_project {
            Some(_) => None,
            None => Some(format::NO_ACTIVE_PROJECT.to_string()),
        })
    }

    async fn set_current_project(&self, name: &str) {
        self.state.write().await.current_project = Some(name.to_string());
        debug!(project = name, "Current project changed");
    }

    /// Send one command to the execute endpoint and decode the envelope.
    async fn dispatch(&self, command: &str) -> ProxyResult<Envelope> {
        let body = serde_json::to_value(ExecuteRequest { command })
            .map_err(|e| ProxyError::remote(e.to_string()))?;
        let reply = self.client.post(EXECUTE_PATH, &body).await?;

        if !reply.is_object() {
            return Err(ProxyError::remote(format!(
                "unexpected reply to '{}': expected an object",
                command
            )));
        }
        serde_json::from_value(reply)
            .map_err(|e| ProxyError::remote(format!("malformed envelope: {}", e)))
    }
}

/// Parse `<start>-<end>` into two unsigned line numbers.
pub fn parse_line_range(range: &str) -> Option<(u32, u32)> {
    let caps = LINE_RANGE.captures(range.trim())?;
    let start = caps[1].parse().ok()?;
    let end = caps[2].parse().ok()?;
    Some((start, end))
}

/// Join command words with single spaces, skipping empty trailing words.
fn join_command(parts: &[&str]) -> String {
    let mut words: Vec<&str> = parts.to_vec();
    while words.len() > 1 && words.last().is_some_and(|w| w.is_empty()) {
        words.pop();
    }
    words.join(" ")
}

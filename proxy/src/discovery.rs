//! Command discovery
//!
//! Fetches and caches the backend's command list. Membership and
//! enumeration queries answer from the cache; schema, examples, and
//! completion suggestions are fetched on demand.
//!
//! # States
//!
//! ```text
//! Uninitialized --initialize()--> Ready --refresh()--> Ready (refetched)
//!                                      \--refresh() fails--> Uninitialized
//! ```
//!
//! While `refresh()` is in flight the cache is empty but still initialized,
//! so concurrent readers see no commands rather than an error.

use crate::client::RemoteClient;
use crate::error::{ProxyError, ProxyResult};
use crate::types::{Command, CommandList, CompletionRequest};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const COMMANDS_PATH: &str = "/api/mcp/commands";
const COMPLETE_PATH: &str = "/api/mcp-api/complete";

#[derive(Debug)]
enum CacheState {
    Uninitialized,
    Ready(Vec<Command>),
}

/// Cache and accessor for the backend's dynamically reported command set.
#[derive(Debug)]
pub struct CommandDiscovery {
    client: RemoteClient,
    cache: RwLock<CacheState>,
}

impl CommandDiscovery {
    pub fn new(client: RemoteClient) -> Self {
        Self {
            client,
            cache: RwLock::new(CacheState::Uninitialized),
        }
    }

    /// Fetch the command list and populate the cache.
    ///
    /// A failure leaves the cache uninitialized.
    pub async fn initialize(&self) -> ProxyResult<()> {
        debug!("Initializing command discovery");
        let commands = self.fetch_commands().await;

        let mut cache = self.cache.write().await;
        match commands {
            Ok(commands) => {
                info!(count = commands.len(), "Discovered backend commands");
                *cache = CacheState::Ready(commands);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Command discovery failed");
                *cache = CacheState::Uninitialized;
                Err(e)
            }
        }
    }

    /// Whether `name` is present in the cache.
    pub async fn has_command(&self, name: &str) -> ProxyResult<bool> {
        match &*self.cache.read().await {
            CacheState::Ready(commands) => Ok(commands.iter().any(|c| c.name == name)),
            CacheState::Uninitialized => Err(ProxyError::not_initialized("CommandDiscovery")),
        }
    }

    /// Snapshot of the cached command list.
    pub async fn all_commands(&self) -> ProxyResult<Vec<Command>> {
        match &*self.cache.read().await {
            CacheState::Ready(commands) => Ok(commands.clone()),
            CacheState::Uninitialized => Err(ProxyError::not_initialized("CommandDiscovery")),
        }
    }

    /// Full schema of one command, as reported by the backend.
    pub async fn command_schema(&self, name: &str) -> ProxyResult<Value> {
        self.ensure_known(name).await?;
        debug!(command = name, "Fetching command schema");

        let body = self
            .client
            .get(&format!("/api/mcp-api/commands/{}/schema", name))
            .await?;
        let schema = metadata_field(body, "schema", "Error retrieving command schema")?;
        Ok(schema.unwrap_or(Value::Null))
    }

    /// Usage examples of one command.
    pub async fn command_examples(&self, name: &str) -> ProxyResult<Vec<String>> {
        self.ensure_known(name).await?;
        debug!(command = name, "Fetching command examples");

        let body = self
            .client
            .get(&format!("/api/mcp-api/commands/{}/examples", name))
            .await?;
        let examples = metadata_field(body, "examples", "Error retrieving command examples")?;

        Ok(match examples {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    /// Discard the cache and fetch the command list again.
    pub async fn refresh(&self) -> ProxyResult<()> {
        {
            let mut cache = self.cache.write().await;
            if let CacheState::Ready(commands) = &mut *cache {
                commands.clear();
            }
        }
        self.initialize().await
    }

    /// Completion suggestions for a command prefix.
    ///
    /// Independent of the cache; works before `initialize()`.
    pub async fn completion_suggestions(&self, prefix: &str) -> ProxyResult<Vec<Value>> {
        debug!(prefix, "Fetching completion suggestions");

        let request = serde_json::to_value(CompletionRequest { prefix })
            .map_err(|e| ProxyError::remote(e.to_string()))?;
        let body = self.client.post(COMPLETE_PATH, &request).await?;
        let suggestions = metadata_field(
            body,
            "suggestions",
            "Error retrieving completion suggestions",
        )?;

        Ok(match suggestions {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        })
    }

    async fn ensure_known(&self, name: &str) -> ProxyResult<()> {
        if self.has_command(name).await? {
            Ok(())
        } else {
            Err(ProxyError::unknown_command(name))
        }
    }

    async fn fetch_commands(&self) -> ProxyResult<Vec<Command>> {
        let body = self
            .client
            .get_strict(COMMANDS_PATH)
            .await
            .map_err(|e| ProxyError::discovery(e.to_string()))?;

        if let Some(message) = reported_failure(&body) {
            return Err(ProxyError::discovery(message));
        }

        let list: CommandList = serde_json::from_value(body)
            .map_err(|e| ProxyError::discovery(format!("malformed command list: {}", e)))?;
        Ok(list.commands)
    }
}

/// The failure message of a 2xx body that still reports `success: false`
/// or carries an `error`.
fn reported_failure(body: &Value) -> Option<String> {
    let error = body
        .get("error")
        .filter(|e| !e.is_null())
        .map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    let failed = body.get("success").and_then(Value::as_bool) == Some(false);

    match error {
        Some(message) if !message.is_empty() => Some(message),
        _ if failed => Some("backend reported failure".to_string()),
        _ => None,
    }
}

/// Extract `field` from a `{ success, <field>?, error? }` metadata reply.
fn metadata_field(body: Value, field: &str, fallback: &str) -> ProxyResult<Option<Value>> {
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !success {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .unwrap_or(fallback);
        return Err(ProxyError::backend(message));
    }

    Ok(match body {
        Value::Object(mut map) => map.remove(field),
        _ => None,
    })
}

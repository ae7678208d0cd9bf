//! In-process fake of the command backend.
//!
//! Serves the execute, discovery, and metadata endpoints on a random local
//! port and records every command it receives.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_COMMANDS: &[&str] = &[
    "create-project",
    "list-projects",
    "switch-project",
    "create-file",
    "read-file",
    "update-file",
    "delete-file",
    "edit",
    "list-files",
    "help",
    "echo",
    "deploy",
    "broken",
];

/// How `GET /api/mcp/commands` misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryFailure {
    /// Answers normally
    None,
    /// `503` with a plain-text body
    PlainText,
    /// `500` with a `{ success: false, error }` envelope
    Envelope,
    /// `200` with a `{ success: false, error }` envelope
    Reported,
}

pub struct FakeBackend {
    commands: Mutex<Vec<String>>,
    projects: Mutex<Vec<(String, String)>>,
    active: Mutex<Option<String>>,
    executed: Mutex<Vec<String>>,
    discovery_hits: AtomicUsize,
    discovery_failure: Mutex<DiscoveryFailure>,
    discovery_delay: Mutex<Duration>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::with_commands(DEFAULT_COMMANDS)
    }

    pub fn with_commands(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            projects: Mutex::new(Vec::new()),
            active: Mutex::new(None),
            executed: Mutex::new(Vec::new()),
            discovery_hits: AtomicUsize::new(0),
            discovery_failure: Mutex::new(DiscoveryFailure::None),
            discovery_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn failing_discovery(mode: DiscoveryFailure) -> Arc<Self> {
        let backend = Self::new();
        backend.set_discovery_failure(mode);
        backend
    }

    pub fn set_discovery_failure(&self, mode: DiscoveryFailure) {
        *self.discovery_failure.lock().unwrap() = mode;
    }

    /// Hold every discovery reply back for `delay`.
    pub fn delay_discovery(&self, delay: Duration) {
        *self.discovery_delay.lock().unwrap() = delay;
    }

    /// Every command received by the execute endpoint, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn discovery_hits(&self) -> usize {
        self.discovery_hits.load(Ordering::SeqCst)
    }

    pub fn set_commands(&self, names: &[&str]) {
        *self.commands.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }

    pub fn add_project(&self, name: &str, description: &str) {
        self.projects
            .lock()
            .unwrap()
            .push((name.to_string(), description.to_string()));
    }

    /// Serve on `127.0.0.1:0` and return the base URL.
    pub async fn spawn(self: &Arc<Self>) -> String {
        let router = Router::new()
            .route("/api/mcp/execute", post(execute))
            .route("/api/mcp/commands", get(commands))
            .route("/api/mcp-api/commands/{name}/schema", get(schema))
            .route("/api/mcp-api/commands/{name}/examples", get(examples))
            .route("/api/mcp-api/complete", post(complete))
            .route("/api/echo", get(echo_query))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

fn ok(result: Value) -> Response {
    Json(json!({ "success": true, "result": result })).into_response()
}

fn failure(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

async fn execute(State(backend): State<Arc<FakeBackend>>, Json(body): Json<Value>) -> Response {
    let command = body["command"].as_str().unwrap_or_default().to_string();
    backend.executed.lock().unwrap().push(command.clone());

    let (name, rest) = command.split_once(' ').unwrap_or((command.as_str(), ""));

    match name {
        "create-project" => {
            let (project, description) = rest.split_once(' ').unwrap_or((rest, ""));
            let mut projects = backend.projects.lock().unwrap();
            if projects.iter().any(|(n, _)| n == project) {
                return failure(
                    StatusCode::OK,
                    format!("Project '{}' already exists", project),
                );
            }
            projects.push((project.to_string(), description.to_string()));
            *backend.active.lock().unwrap() = Some(project.to_string());
            ok(json!({ "name": project }))
        }
        "list-projects" => {
            let active = backend.active.lock().unwrap().clone();
            let projects: Vec<Value> = backend
                .projects
                .lock()
                .unwrap()
                .iter()
                .map(|(n, d)| {
                    json!({
                        "name": n,
                        "description": d,
                        "isActive": active.as_deref() == Some(n.as_str()),
                    })
                })
                .collect();
            ok(json!({ "projects": projects }))
        }
        "switch-project" => {
            let exists = backend.projects.lock().unwrap().iter().any(|(n, _)| n == rest);
            if !exists {
                return failure(StatusCode::OK, format!("Project '{}' not found", rest));
            }
            *backend.active.lock().unwrap() = Some(rest.to_string());
            ok(json!({ "name": rest }))
        }
        "read-file" => {
            let active = backend.active.lock().unwrap().clone().unwrap_or_default();
            ok(json!({ "content": format!("contents of {} in {}", rest, active) }))
        }
        "create-file" | "update-file" | "delete-file" | "edit" => {
            Json(json!({ "success": true })).into_response()
        }
        "list-files" => ok(json!({ "files": [
            { "name": "src", "type": "directory" },
            { "name": "main.rs", "size": 12 }
        ]})),
        "help" => ok(json!("Available commands: create-project, list-projects")),
        "echo" => ok(json!(rest)),
        "crash" => (StatusCode::INTERNAL_SERVER_ERROR, "internal failure").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            ok(json!("late"))
        }
        other => failure(
            StatusCode::BAD_REQUEST,
            format!("Unknown command: {}", other),
        ),
    }
}

async fn commands(State(backend): State<Arc<FakeBackend>>) -> Response {
    backend.discovery_hits.fetch_add(1, Ordering::SeqCst);

    let delay = *backend.discovery_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *backend.discovery_failure.lock().unwrap();
    match mode {
        DiscoveryFailure::None => {}
        DiscoveryFailure::PlainText => {
            return (StatusCode::SERVICE_UNAVAILABLE, "discovery offline").into_response();
        }
        DiscoveryFailure::Envelope => {
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "discovery offline".into());
        }
        DiscoveryFailure::Reported => {
            return failure(StatusCode::OK, "index rebuilding".into());
        }
    }

    let commands: Vec<Value> = backend
        .commands
        .lock()
        .unwrap()
        .iter()
        .map(|n| json!({ "name": n, "handler": format!("handle_{}", n) }))
        .collect();
    Json(json!({ "commands": commands })).into_response()
}

async fn echo_query(Query(params): Query<BTreeMap<String, String>>) -> Response {
    Json(json!({ "query": params })).into_response()
}

async fn schema(Path(name): Path<String>) -> Response {
    if name == "broken" {
        return Json(json!({ "success": false, "error": "schema unavailable" })).into_response();
    }
    Json(json!({
        "success": true,
        "schema": { "name": name, "args": ["target"] }
    }))
    .into_response()
}

async fn examples(Path(name): Path<String>) -> Response {
    Json(json!({
        "success": true,
        "examples": [format!("{} staging", name)]
    }))
    .into_response()
}

async fn complete(State(backend): State<Arc<FakeBackend>>, Json(body): Json<Value>) -> Response {
    let prefix = body["prefix"].as_str().unwrap_or_default();
    let suggestions: Vec<String> = backend
        .commands
        .lock()
        .unwrap()
        .iter()
        .filter(|n| n.starts_with(prefix))
        .cloned()
        .collect();
    Json(json!({ "success": true, "suggestions": suggestions })).into_response()
}

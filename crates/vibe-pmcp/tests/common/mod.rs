//! Test fixtures: a fake command backend and an in-process bridge.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vibe_pmcp::{http, SessionRegistry};
use vibe_proxy::ProxyConfig;

pub const COMMANDS: &[&str] = &[
    "create-project",
    "list-projects",
    "switch-project",
    "read-file",
    "help",
    "deploy",
    "slow",
];

/// How `GET /api/mcp/commands` misbehaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryFailure {
    #[default]
    None,
    /// `503` with a plain-text body
    PlainText,
    /// `500` with a `{ success: false, error }` envelope
    Envelope,
}

/// Backend that keeps one global project list and records every command.
#[derive(Default)]
pub struct FakeBackend {
    projects: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
    discovery_failure: Mutex<DiscoveryFailure>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_discovery(mode: DiscoveryFailure) -> Arc<Self> {
        let backend = Self::new();
        *backend.discovery_failure.lock().unwrap() = mode;
        backend
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn add_project(&self, name: &str) {
        self.projects.lock().unwrap().push(name.to_string());
    }

    /// Serve on `127.0.0.1:0` and return the base URL.
    pub async fn spawn(self: &Arc<Self>) -> String {
        let router = Router::new()
            .route("/api/mcp/execute", post(execute))
            .route("/api/mcp/commands", get(commands))
            .with_state(self.clone());
        serve_router(router).await
    }
}

async fn execute(State(backend): State<Arc<FakeBackend>>, Json(body): Json<Value>) -> Response {
    let command = body["command"].as_str().unwrap_or_default().to_string();
    backend.executed.lock().unwrap().push(command.clone());

    let (name, rest) = command.split_once(' ').unwrap_or((command.as_str(), ""));
    match name {
        "create-project" => {
            let project = rest.split(' ').next().unwrap_or_default();
            backend.projects.lock().unwrap().push(project.to_string());
            Json(json!({ "success": true })).into_response()
        }
        "switch-project" => {
            let known = backend.projects.lock().unwrap().iter().any(|p| p == rest);
            if known {
                Json(json!({ "success": true })).into_response()
            } else {
                Json(json!({ "success": false, "error": format!("Project '{}' not found", rest) }))
                    .into_response()
            }
        }
        "list-projects" => {
            let projects: Vec<Value> = backend
                .projects
                .lock()
                .unwrap()
                .iter()
                .map(|p| json!({ "name": p }))
                .collect();
            Json(json!({ "success": true, "result": { "projects": projects } })).into_response()
        }
        "read-file" => Json(json!({ "success": true, "result": { "content": format!("file {}", rest) } }))
            .into_response(),
        "help" => Json(json!({ "success": true, "result": "help text" })).into_response(),
        "deploy" => Json(json!({ "success": true, "result": format!("deployed {}", rest) }))
            .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(json!({ "success": true, "result": "late" })).into_response()
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": format!("Unknown command: {}", other) })),
        )
            .into_response(),
    }
}

async fn commands(State(backend): State<Arc<FakeBackend>>) -> Response {
    let mode = *backend.discovery_failure.lock().unwrap();
    match mode {
        DiscoveryFailure::None => {}
        DiscoveryFailure::PlainText => {
            return (StatusCode::SERVICE_UNAVAILABLE, "discovery offline").into_response();
        }
        DiscoveryFailure::Envelope => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "discovery offline" })),
            )
                .into_response();
        }
    }
    let commands: Vec<Value> = COMMANDS
        .iter()
        .map(|n| json!({ "name": n, "handler": n }))
        .collect();
    Json(json!({ "commands": commands })).into_response()
}

async fn serve_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// A running HTTP bridge in front of a fake backend.
pub struct TestBridge {
    pub url: String,
    pub registry: Arc<SessionRegistry>,
    pub backend: Arc<FakeBackend>,
    pub client: reqwest::Client,
}

impl TestBridge {
    pub async fn start(backend: Arc<FakeBackend>) -> Self {
        let backend_url = backend.spawn().await;
        let registry = Arc::new(SessionRegistry::new(ProxyConfig::new(
            backend_url,
            Duration::from_secs(5),
        )));
        let url = serve_router(http::router(registry.clone())).await;

        Self {
            url,
            registry,
            backend,
            client: reqwest::Client::new(),
        }
    }

    pub fn mcp_url(&self) -> String {
        format!("{}/mcp", self.url)
    }

    /// Send `initialize` only and return the new session id.
    pub async fn open_session(&self) -> String {
        let response = self.post(None, &initialize_request(1)).await;
        assert_eq!(response.status(), 200);
        response
            .headers()
            .get(http::SESSION_HEADER)
            .expect("session header")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// Complete the handshake (`initialize`, then `notifications/initialized`)
    /// and return the session id.
    pub async fn initialize(&self) -> String {
        let session = self.open_session().await;
        let response = self.post(Some(&session), &initialized_notification()).await;
        assert_eq!(response.status(), 202);
        session
    }

    /// POST `body` on `session` and return the raw response.
    pub async fn post(&self, session: Option<&str>, body: &Value) -> reqwest::Response {
        let mut request = self.client.post(self.mcp_url()).json(body);
        if let Some(id) = session {
            request = request.header(http::SESSION_HEADER, id);
        }
        request.send().await.unwrap()
    }

    /// Call a tool and return the text of its first content block.
    pub async fn call_tool(&self, session: &str, name: &str, arguments: Value) -> String {
        let response = self
            .post(
                Some(session),
                &json!({
                    "jsonrpc": "2.0",
                    "id": 10,
                    "method": "tools/call",
                    "params": { "name": name, "arguments": arguments }
                }),
            )
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body["result"]["content"][0]["text"]
            .as_str()
            .unwrap_or_else(|| panic!("no text content in {}", body))
            .to_string()
    }

    pub async fn status(&self) -> Value {
        self.client
            .get(format!("{}/status", self.url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

pub fn initialize_request(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "integration-test", "version": "0.0.0" }
        }
    })
}

pub fn initialized_notification() -> Value {
    json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })
}

pub fn request(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

//! HTTP transport
//!
//! | Route | Behavior |
//! |-------|----------|
//! | `POST /mcp` | open a session (`initialize` without a session header) or continue one |
//! | `GET /mcp` | `405` for a valid session; no server-push stream |
//! | `DELETE /mcp` | terminate the session |
//! | `GET /status` | name, version, and active session count |
//!
//! Every `/mcp` request other than a session-opening `initialize` must carry
//! the `mcp-session-id` header of a registered session, or it is rejected
//! with `400` and the fixed `-32000` error. Accepted messages are handed to
//! the session's rmcp service; see [`crate::session`].

use crate::config::{BridgeConfig, SERVER_NAME, SERVER_VERSION};
use crate::protocol;
use crate::session::{Session, SessionRegistry};
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::ALLOW;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::model::ErrorCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Build the bridge router over `registry`.
pub fn router(registry: Arc<SessionRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route(
            "/mcp",
            post(handle_post).get(handle_get).delete(handle_delete),
        )
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(registry)
}

/// Bind `host:port` and serve until Ctrl-C.
pub async fn serve(config: &BridgeConfig) -> anyhow::Result<()> {
    let registry = Arc::new(SessionRegistry::new(config.proxy.clone()));
    let addr = config.listen_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(
        %addr,
        backend = %config.proxy.server_url,
        "{} HTTP bridge listening on http://{}/mcp",
        SERVER_NAME,
        addr
    );

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_post(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Unparseable request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(protocol::parse_error_response(e)),
            )
                .into_response();
        }
    };

    let session = match session_id(&headers) {
        Some(id) => match registry.get(id) {
            Some(session) => session,
            None => return bad_session(),
        },
        None if protocol::is_initialize_request(&message) => match registry.open().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to open session");
                return internal_error(&e.to_string());
            }
        },
        None => return bad_session(),
    };

    let reply = session.handle(message).await;

    // Torn down while the request was in flight: the reply is dropped.
    if !registry.contains(session.id()) {
        debug!(session_id = %session.id(), "Discarding reply for closed session");
        return bad_session();
    }

    let response = match reply {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    with_session_header(response, &session)
}

async fn handle_get(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
) -> Response {
    match session_id(&headers).and_then(|id| registry.get(id)) {
        Some(session) => {
            let response = (
                StatusCode::METHOD_NOT_ALLOWED,
                [(ALLOW, "POST, DELETE")],
            )
                .into_response();
            with_session_header(response, &session)
        }
        None => bad_session(),
    }
}

async fn handle_delete(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
) -> Response {
    match session_id(&headers) {
        Some(id) if registry.close(id) => StatusCode::OK.into_response(),
        _ => bad_session(),
    }
}

async fn status(State(registry): State<Arc<SessionRegistry>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": SERVER_NAME,
        "version": SERVER_VERSION,
        "activeSessions": registry.len(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn bad_session() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(protocol::bad_session_response()),
    )
        .into_response()
}

fn internal_error(message: &str) -> Response {
    let body = protocol::error_reply(
        Value::Null,
        ErrorCode::INTERNAL_ERROR,
        format!("Internal server error: {}", message),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn with_session_header(mut response: Response, session: &Session) -> Response {
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

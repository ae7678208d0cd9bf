//! Bridge-level JSON-RPC handling
//!
//! The MCP methods themselves are served by rmcp inside each session. The
//! HTTP bridge only needs to look at envelopes: whether a body opens a
//! session, whether a message expects a reply, and the few error replies it
//! produces on its own (parse errors, bad sessions, malformed messages).

use rmcp::model::ErrorCode;
use serde_json::{json, Value};

/// Missing or unknown session identifier
pub const BAD_SESSION: ErrorCode = ErrorCode(-32000);

pub const BAD_SESSION_MESSAGE: &str = "Bad Request: No valid session ID provided";

/// What the bridge does with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Forward and wait for the reply carrying this id
    Request(Value),
    /// Forward, nothing comes back (notifications and client responses)
    Notification,
    /// Answer directly with this error; never forwarded
    Rejected(Value),
}

/// Classify a single (non-batch) message.
///
/// An absent `id` marks a notification. A present `id` must be a string or
/// a number: `"id": null` is a malformed request, not a notification.
pub fn classify(message: &Value) -> Inbound {
    let Some(fields) = message.as_object() else {
        return Inbound::Rejected(invalid_request(Value::Null, "message must be an object"));
    };

    let has_method = fields.get("method").is_some_and(Value::is_string);
    let is_response = fields.contains_key("result") || fields.contains_key("error");

    match fields.get("id") {
        None if has_method => Inbound::Notification,
        None => Inbound::Rejected(invalid_request(Value::Null, "missing method")),
        Some(id @ (Value::String(_) | Value::Number(_))) if has_method => {
            Inbound::Request(id.clone())
        }
        Some(Value::String(_) | Value::Number(_)) if is_response => Inbound::Notification,
        Some(id @ (Value::String(_) | Value::Number(_))) => {
            Inbound::Rejected(invalid_request(id.clone(), "missing method"))
        }
        Some(_) => Inbound::Rejected(invalid_request(
            Value::Null,
            "id must be a string or a number",
        )),
    }
}

/// Whether `body` (a single message or a batch) carries an `initialize`
/// request.
pub fn is_initialize_request(body: &Value) -> bool {
    match body {
        Value::Array(items) => items.iter().any(is_single_initialize),
        other => is_single_initialize(other),
    }
}

fn is_single_initialize(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some("initialize")
        && matches!(classify(message), Inbound::Request(_))
}

/// A JSON-RPC error reply.
pub fn error_reply(id: Value, code: ErrorCode, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": { "code": code.0, "message": message.into() },
        "id": id,
    })
}

pub fn invalid_request(id: Value, detail: &str) -> Value {
    error_reply(
        id,
        ErrorCode::INVALID_REQUEST,
        format!("Invalid Request: {}", detail),
    )
}

/// Fixed reply for a request whose session identifier is missing or unknown.
pub fn bad_session_response() -> Value {
    error_reply(Value::Null, BAD_SESSION, BAD_SESSION_MESSAGE)
}

/// Reply for a body that is not valid JSON.
pub fn parse_error_response(detail: impl std::fmt::Display) -> Value {
    error_reply(
        Value::Null,
        ErrorCode::PARSE_ERROR,
        format!("Parse error: {}", detail),
    )
}

//! Text rendering of backend envelopes.
//!
//! Every adapter operation ends here: a result is a display string, and a
//! failure is a display string starting with `Error`.

use crate::types::{Envelope, FileEntry, ProjectEntry};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Returned by `execute_command` when the backend succeeds without a payload
pub const COMMAND_OK: &str = "Command executed successfully";

/// Returned by file operations when no project has been selected
pub const NO_ACTIVE_PROJECT: &str =
    "Error: no active project. Use create-project or switch-project first.";

/// Render a payload in its canonical text form.
///
/// Strings are returned verbatim; everything else is pretty-printed JSON.
pub fn payload_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Render a failure envelope, with an optional operation context.
pub fn error_text(context: Option<&str>, envelope: &Envelope) -> String {
    match context {
        Some(ctx) => format!("Error {}: {}", ctx, envelope.error_message()),
        None => format!("Error: {}", envelope.error_message()),
    }
}

/// Render the result of a generic command.
pub fn command_text(envelope: &Envelope) -> String {
    if !envelope.success {
        return error_text(None, envelope);
    }
    match envelope.payload() {
        Some(payload) => payload_text(payload),
        None => COMMAND_OK.to_string(),
    }
}

/// Render a `list-projects` payload as a bulleted listing.
///
/// Returns `None` when the payload carries no `projects` array.
pub fn project_listing(payload: &Value) -> Option<String> {
    let entries = payload.get("projects")?.as_array()?;

    let header = format!("Available projects ({}):", entries.len());
    if entries.is_empty() {
        return Some(header);
    }

    let lines: Vec<String> = entries
        .iter()
        .map(|entry| match decode_entry::<ProjectEntry>("project", entry) {
            Some(p) => format!(
                "- {}{}: {}",
                p.name,
                if p.is_active { " (active)" } else { "" },
                p.description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or("No description")
            ),
            None => format!("- {}", entry_label(entry)),
        })
        .collect();

    Some(format!("{}\n\n{}", header, lines.join("\n")))
}

/// Render a `list-files` payload as a bulleted listing.
///
/// Accepts either `{ files: [...] }` or a bare array.
pub fn file_listing(directory: &str, payload: &Value) -> Option<String> {
    let entries = match payload {
        Value::Array(items) => items,
        other => other.get("files")?.as_array()?,
    };

    let shown = if directory.is_empty() { "/" } else { directory };
    let header = format!("Files in '{}' ({}):", shown, entries.len());
    if entries.is_empty() {
        return Some(header);
    }

    let lines: Vec<String> = entries
        .iter()
        .map(|entry| match decode_entry::<FileEntry>("file", entry) {
            Some(f) if f.is_dir() => format!("- {}/ (directory)", f.name.trim_end_matches('/')),
            Some(f) => match f.size {
                Some(size) => format!("- {} ({} bytes)", f.name, size),
                None => format!("- {}", f.name),
            },
            None => format!("- {}", entry_label(entry)),
        })
        .collect();

    Some(format!("{}\n\n{}", header, lines.join("\n")))
}

fn decode_entry<T: DeserializeOwned>(kind: &str, entry: &Value) -> Option<T> {
    match serde_json::from_value(entry.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(kind, error = %e, entry = %entry, "Listing entry did not decode, showing it raw");
            None
        }
    }
}

/// Best-effort label for an entry that did not decode: its `name` (or
/// `path`) when that is a string, the compact JSON otherwise.
fn entry_label(entry: &Value) -> String {
    match entry.get("name").or_else(|| entry.get("path")) {
        Some(Value::String(name)) => name.clone(),
        _ => match entry {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// Extract file content from a `read-file` payload.
pub fn file_content(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("content") {
            Some(Value::String(s)) => s.clone(),
            _ => payload_text(payload),
        },
        other => payload_text(other),
    }
}

/// Render completion suggestions, one per line.
pub fn suggestion_listing(prefix: &str, suggestions: &[Value]) -> String {
    if suggestions.is_empty() {
        return format!("No suggestions for '{}'", prefix);
    }
    let lines: Vec<String> = suggestions
        .iter()
        .map(|s| match s {
            Value::String(text) => format!("- {}", text),
            Value::Object(map) => match map.get("name").or_else(|| map.get("command")) {
                Some(Value::String(name)) => format!("- {}", name),
                _ => format!("- {}", s),
            },
            other => format!("- {}", other),
        })
        .collect();
    format!(
        "Suggestions for '{}' ({}):\n\n{}",
        prefix,
        suggestions.len(),
        lines.join("\n")
    )
}

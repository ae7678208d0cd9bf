//! Thin HTTP wrapper around the command backend.
//!
//! One call, one request: no retries, no reconnection. A transport failure
//! or a non-2xx reply without a JSON body surfaces as
//! [`ProxyError::RemoteCommunication`]; callers decide what to do with it.
//! [`RemoteClient::get_strict`] also rejects non-2xx envelopes.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Maximum payload characters written to a trace line
const TRACE_PAYLOAD_LIMIT: usize = 200;

/// HTTP client bound to one backend base URL.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(config: &ProxyConfig) -> ProxyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProxyError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one request and return the parsed JSON body.
    ///
    /// A non-2xx reply whose body is a JSON object is returned as-is so the
    /// caller can read the envelope's `error` field.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> ProxyResult<Value> {
        let (status, text) = self.send(method, path, query, body).await?;
        let parsed = serde_json::from_str::<Value>(&text);

        if !status.is_success() {
            return match parsed {
                Ok(value) if value.is_object() => Ok(value),
                _ => Err(status_error(status, &text)),
            };
        }

        parsed.map_err(|e| ProxyError::remote(format!("invalid JSON from {}: {}", path, e)))
    }

    pub async fn get(&self, path: &str) -> ProxyResult<Value> {
        self.request(Method::GET, path, None, None).await
    }

    /// GET that fails on any non-2xx status, envelope or not.
    pub async fn get_strict(&self, path: &str) -> ProxyResult<Value> {
        let (status, text) = self.send(Method::GET, path, None, None).await?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| ProxyError::remote(format!("invalid JSON from {}: {}", path, e)))
    }

    pub async fn post(&self, path: &str, body: &Value) -> ProxyResult<Value> {
        self.request(Method::POST, path, None, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> ProxyResult<(StatusCode, String)> {
        debug!(
            method = %method,
            path,
            query = ?query,
            payload = %truncate_payload(body),
            "backend request"
        );

        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(params) = query {
            builder = builder.query(params);
        }
        if let Some(json) = body {
            builder = builder.json(json);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(
            method = %method,
            path,
            status = status.as_u16(),
            payload = %truncate(&text),
            "backend response"
        );

        Ok((status, text))
    }
}

fn status_error(status: StatusCode, text: &str) -> ProxyError {
    ProxyError::remote(format!("HTTP {}: {}", status, truncate(text)))
}

fn truncate_payload(body: Option<&Value>) -> String {
    match body {
        Some(value) => truncate(&value.to_string()),
        None => String::from("-"),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= TRACE_PAYLOAD_LIMIT {
        return text.to_string();
    }
    let mut out: String = text.chars().take(TRACE_PAYLOAD_LIMIT).collect();
    out.push_str("...");
    out
}

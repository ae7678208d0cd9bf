//! Session registry
//!
//! Maps session identifiers to live sessions. The map is the only state
//! shared between request handlers; each session carries its own adapter,
//! tool set, and rmcp service.
//!
//! A session's [`McpServer`] runs as an rmcp service on one end of an
//! in-memory duplex pipe. The HTTP handlers hold the other end and exchange
//! newline-delimited JSON-RPC over it, one message at a time.
//!
//! Lookups clone the `Arc<Session>` and release the shard guard
//! immediately, so no map lock is ever held across an `.await`.

use crate::error::{BridgeError, BridgeResult};
use crate::mcp::McpServer;
use crate::protocol::{self, Inbound};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rmcp::model::ErrorCode;
use rmcp::ServiceExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vibe_proxy::{ProxyAdapter, ProxyConfig};

/// Bytes buffered in each direction of a session pipe
const PIPE_CAPACITY: usize = 64 * 1024;

/// Slack added on top of the backend timeout while waiting for a reply
const REPLY_GRACE: Duration = Duration::from_secs(5);

/// Client end of the pipe to one session's rmcp service.
#[derive(Debug)]
struct ServiceChannel {
    writer: WriteHalf<DuplexStream>,
    replies: Lines<BufReader<ReadHalf<DuplexStream>>>,
}

impl ServiceChannel {
    /// Start `server` on one end of a fresh pipe and keep the other.
    ///
    /// The service stops once this channel is dropped.
    fn start(session_id: &str, server: McpServer) -> Self {
        let (client_end, service_end) = tokio::io::duplex(PIPE_CAPACITY);
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            let transport = tokio::io::split(service_end);
            match server.serve(transport).await {
                Ok(service) => match service.waiting().await {
                    Ok(_) => debug!(%session_id, "Session service stopped"),
                    Err(e) => warn!(%session_id, error = %e, "Session service task failed"),
                },
                Err(e) => debug!(
                    %session_id,
                    error = %e,
                    "Session service ended before initialization"
                ),
            }
        });

        let (reader, writer) = tokio::io::split(client_end);
        Self {
            writer,
            replies: BufReader::new(reader).lines(),
        }
    }

    async fn send(&mut self, message: &Value) -> BridgeResult<()> {
        let mut line =
            serde_json::to_vec(message).map_err(|e| BridgeError::transport(e.to_string()))?;
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))
    }

    /// Read until the reply to `id` arrives. Server-initiated messages are
    /// skipped.
    async fn reply_to(&mut self, id: &Value) -> BridgeResult<Value> {
        while let Some(line) = self
            .replies
            .next_line()
            .await
            .map_err(|e| BridgeError::transport(e.to_string()))?
        {
            let message: Value = match serde_json::from_str(&line) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Unparseable line from session service");
                    continue;
                }
            };
            if message.get("method").is_none() && message.get("id") == Some(id) {
                return Ok(message);
            }
            debug!(message = %message, "Skipping unsolicited service message");
        }
        Err(BridgeError::transport("session service stopped"))
    }
}

/// One client connection and its protocol server.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    adapter: Arc<ProxyAdapter>,
    /// Held for the duration of one message so a session's requests are
    /// handled one at a time, in arrival order.
    channel: Mutex<ServiceChannel>,
    reply_timeout: Duration,
}

impl Session {
    fn start(id: String, server: McpServer, reply_timeout: Duration) -> Self {
        let adapter = Arc::clone(server.adapter());
        let channel = ServiceChannel::start(&id, server);
        Self {
            id,
            created_at: Utc::now(),
            adapter,
            channel: Mutex::new(channel),
            reply_timeout,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn adapter(&self) -> &Arc<ProxyAdapter> {
        &self.adapter
    }

    /// Handle one message or batch on this session.
    ///
    /// Returns `None` when nothing needs to be sent back (notifications
    /// only). Batch members are handled in order.
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let mut channel = self.channel.lock().await;

        match message {
            Value::Array(items) if items.is_empty() => {
                Some(protocol::invalid_request(Value::Null, "empty batch"))
            }
            Value::Array(items) => {
                let mut replies = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(reply) = self.forward(&mut channel, item).await {
                        replies.push(reply);
                    }
                }
                if replies.is_empty() {
                    None
                } else {
                    Some(Value::Array(replies))
                }
            }
            single => self.forward(&mut channel, single).await,
        }
    }

    async fn forward(&self, channel: &mut ServiceChannel, message: Value) -> Option<Value> {
        let id = match protocol::classify(&message) {
            Inbound::Rejected(reply) => {
                debug!(session_id = %self.id, "Rejecting malformed message");
                return Some(reply);
            }
            Inbound::Notification => None,
            Inbound::Request(id) => Some(id),
        };

        match self.exchange(channel, &message, id.as_ref()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Session exchange failed");
                id.map(|id| protocol::error_reply(id, ErrorCode::INTERNAL_ERROR, e.to_string()))
            }
        }
    }

    async fn exchange(
        &self,
        channel: &mut ServiceChannel,
        message: &Value,
        id: Option<&Value>,
    ) -> BridgeResult<Option<Value>> {
        channel.send(message).await?;

        let Some(id) = id else {
            return Ok(None);
        };
        let reply = tokio::time::timeout(self.reply_timeout, channel.reply_to(id))
            .await
            .map_err(|_| BridgeError::transport("no reply from session service"))??;
        Ok(Some(reply))
    }
}

/// Concurrent map of active sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    proxy: ProxyConfig,
}

impl SessionRegistry {
    /// `proxy` configures the adapter created for every new session.
    pub fn new(proxy: ProxyConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            proxy,
        }
    }

    /// Create, initialize, and register a new session.
    ///
    /// The adapter is initialized before anything is registered: a discovery
    /// failure leaves the registry untouched.
    pub async fn open(&self) -> BridgeResult<Arc<Session>> {
        let server = McpServer::connect(&self.proxy).await?;
        // A resource read may take two backend round trips.
        let reply_timeout = self.proxy.timeout.saturating_mul(2) + REPLY_GRACE;

        loop {
            let id = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                let session = Arc::new(Session::start(id, server, reply_timeout));
                slot.insert(Arc::clone(&session));
                info!(
                    session_id = %session.id(),
                    active = self.sessions.len(),
                    "Session opened"
                );
                return Ok(session);
            }
            debug!(session_id = %id, "Session id collision, regenerating");
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Deregister a session. Returns whether it was registered.
    ///
    /// The session's service stops once in-flight requests release it.
    pub fn close(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                info!(
                    session_id = %id,
                    lifetime_secs = (Utc::now() - session.created_at()).num_seconds(),
                    "Session closed"
                );
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

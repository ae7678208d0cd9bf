//! Vibe Proxy Library
//!
//! Client side of the VibePMCP bridge: everything that talks to the remote
//! command-execution backend.
//!
//! - [`RemoteClient`]: one HTTP request per call, fixed base URL and timeout
//! - [`CommandDiscovery`]: cached list of the backend's commands plus
//!   on-demand schema, examples, and completion lookups
//! - [`ProxyAdapter`]: per-session facade turning project and file operations
//!   into backend commands and tracking the current project
//!
//! Every adapter operation returns display text. A backend that reports
//! failure produces text starting with `Error`; only contract violations and
//! transport failures come back as [`ProxyError`].
//!
//! # Backend contract
//!
//! | Call | Endpoint |
//! |------|----------|
//! | commands | `POST /api/mcp/execute` with `{ command }` |
//! | discovery | `GET /api/mcp/commands` |
//! | schema / examples | `GET /api/mcp-api/commands/{name}/schema` and `/examples` |
//! | completion | `POST /api/mcp-api/complete` with `{ prefix }` |

#![allow(clippy::uninlined_format_args)]

pub mod adapter;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod types;

pub use adapter::{parse_line_range, AdapterState, ProxyAdapter};
pub use client::RemoteClient;
pub use config::ProxyConfig;
pub use discovery::CommandDiscovery;
pub use error::{ProxyError, ProxyResult};
pub use types::{Command, Envelope};

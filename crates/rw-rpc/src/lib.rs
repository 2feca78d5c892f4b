//! HTTP transport for the restwatch collector.
//!
//! The wire surface is JSON over HTTP:
//!
//! | Method | Path         | Body          | Response                          |
//! |--------|--------------|---------------|-----------------------------------|
//! | GET    | `/clock`     |               | `Snapshot`                        |
//! | POST   | `/tick`      |               | `204`                             |
//! | PUT    | `/durations` | `Durations`   | `204`, or `422 {"error": "..."}`  |
//! | GET    | `/health`    |               | `{"status": "ok"}`                |
//!
//! Clients may name themselves with the [`CLIENT_HEADER`] header; the server
//! only uses it in logs.

mod client;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::CollectorClient;
pub use server::{router, serve};

/// Request header carrying a client label.
pub const CLIENT_HEADER: &str = "x-restwatch-client";

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Collector RPC errors.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The request never got a response (refused, timed out, reset).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The collector answered with a non-success status.
    #[error("collector returned {status}: {message}")]
    Status { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Whether the collector understood the request and refused it.
    ///
    /// Anything else means the collector can't be relied on.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == 422)
    }

    /// Whether nothing accepted the connection at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_connect())
    }
}

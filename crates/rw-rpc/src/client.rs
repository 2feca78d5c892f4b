use std::time::Duration;

use rw_core::{Durations, Snapshot};

use crate::{CLIENT_HEADER, ErrorBody, RpcError};

/// Talks to a collector server.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    http: reqwest::Client,
    addr: String,
    base_url: String,
    label: String,
}

impl CollectorClient {
    /// Creates a client for the collector at `addr` (`host:port`).
    ///
    /// Every request gives up after `timeout`.
    pub fn new(addr: &str, timeout: Duration, label: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::ClientBuild)?;
        Ok(Self {
            http,
            addr: addr.to_string(),
            base_url: format!("http://{addr}"),
            label: label.into(),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn get(&self) -> Result<Snapshot, RpcError> {
        let response = self
            .http
            .get(self.url("/clock"))
            .header(CLIENT_HEADER, &self.label)
            .send()
            .await?;
        let response = check(response).await?;
        response
            .json::<Snapshot>()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    pub async fn tick(&self) -> Result<(), RpcError> {
        let response = self
            .http
            .post(self.url("/tick"))
            .header(CLIENT_HEADER, &self.label)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn put(&self, durations: Durations) -> Result<(), RpcError> {
        let response = self
            .http
            .put(self.url("/durations"))
            .header(CLIENT_HEADER, &self.label)
            .json(&durations)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Succeeds if the server answers its health check.
    pub async fn health(&self) -> Result<(), RpcError> {
        let response = self.http.get(self.url("/health")).send().await?;
        check(response).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, RpcError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body).map_or(body, |parsed| parsed.error);
    Err(RpcError::Status {
        status: status.as_u16(),
        message,
    })
}

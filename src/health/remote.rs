//! Readiness probe against another buildmeta-serving process

use super::checker::Checker;
use crate::error::{CheckError, DownstreamError, ProbeError};
use crate::server::{BASE_PATH, READY_PATH};
use async_trait::async_trait;
use tracing::debug;

/// Checks a downstream service through its well-known readiness endpoint
///
/// Issues `GET <root>/-/ready`. Timeouts are whatever the supplied client is
/// configured with; wrap in a [`PeriodicChecker`](super::PeriodicChecker) to
/// keep probes off the request path.
#[derive(Debug, Clone)]
pub struct MetaChecker {
    root: String,
    client: reqwest::Client,
}

impl MetaChecker {
    pub fn new(root: impl Into<String>) -> Self {
        Self::with_client(root, reqwest::Client::new())
    }

    pub fn with_client(root: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            root: root.into(),
            client,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// URL of the downstream readiness endpoint
    pub fn ready_url(&self) -> String {
        format!("{}{}{}", self.root.trim_end_matches('/'), BASE_PATH, READY_PATH)
    }

    /// Probe once
    ///
    /// Transport failures are returned as-is; a status of 400 or above is a
    /// [`DownstreamError`] carrying the decoded body (`null` if the body was
    /// not JSON).
    pub async fn probe(&self) -> Result<(), ProbeError> {
        let url = self.ready_url();
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.as_u16() < 400 {
            return Ok(());
        }

        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
            Err(_) => serde_json::Value::Null,
        };
        debug!(url = %url, status = %status, "Downstream readiness probe failed");

        Err(ProbeError::Downstream(DownstreamError {
            status_code: status.as_u16(),
            root: self.root.clone(),
            status: status.to_string(),
            body,
        }))
    }
}

#[async_trait]
impl Checker for MetaChecker {
    async fn check(&self) -> Result<(), CheckError> {
        self.probe().await.map_err(CheckError::from)
    }
}

//! Named collection of health checks

use super::checker::Checker;
use crate::error::CheckError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Thread-safe registry of named checks
///
/// Checks can be registered at any time, including while requests are being
/// served. Clone is cheap and clones share the same checks.
#[derive(Clone, Default)]
pub struct Registry {
    checks: Arc<RwLock<BTreeMap<String, Arc<dyn Checker>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` under `name`, replacing any check already using it
    pub fn register(&self, name: impl Into<String>, check: impl Checker + 'static) {
        let name = name.into();
        debug!(check = %name, "Registering health check");
        self.checks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, Arc::new(check));
    }

    /// Remove the check registered under `name`
    pub fn unregister(&self, name: &str) -> bool {
        self.checks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some()
    }

    /// Names of all registered checks, sorted
    pub fn names(&self) -> Vec<String> {
        self.checks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Evaluate every registered check concurrently
    ///
    /// Returns the failing checks keyed by name; empty means healthy.
    pub async fn check_all(&self) -> BTreeMap<String, CheckError> {
        let checks: Vec<(String, Arc<dyn Checker>)> = self
            .checks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, check)| (name.clone(), Arc::clone(check)))
            .collect();

        let results = futures::future::join_all(checks.into_iter().map(|(name, check)| async move {
            let result = check.check().await;
            (name, result)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(name, result)| result.err().map(|e| (name, e)))
            .collect()
    }

    /// Evaluate all checks and render the aggregate HTTP response
    ///
    /// 200 with `{}` when everything passes, 503 with a JSON object of
    /// failing check names to their errors otherwise.
    pub async fn respond(&self) -> Response {
        let failures = self.check_all().await;
        if failures.is_empty() {
            return (StatusCode::OK, Json(failures)).into_response();
        }

        warn!(
            failing = ?failures.keys().collect::<Vec<_>>(),
            "Health checks failing"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(failures)).into_response()
    }
}

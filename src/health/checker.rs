//! Health check trait and composable check policies

use crate::error::CheckError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Message reported by a [`PeriodicChecker`] before its first run completes
pub const PENDING_MESSAGE: &str = "check has not completed yet";

/// Shortest period a [`PeriodicChecker`] runs at
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A named health signal that can be evaluated on demand
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self) -> Result<(), CheckError>;
}

#[async_trait]
impl<C: Checker + ?Sized> Checker for Arc<C> {
    async fn check(&self) -> Result<(), CheckError> {
        (**self).check().await
    }
}

/// A check backed by a plain closure
pub struct CheckFn<F>(pub F);

#[async_trait]
impl<F> Checker for CheckFn<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    async fn check(&self) -> Result<(), CheckError> {
        (self.0)().map_err(CheckError::from)
    }
}

/// Wrap a closure as a [`Checker`]
pub fn check_fn<F>(f: F) -> CheckFn<F>
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    CheckFn(f)
}

/// Only fails once `threshold` failures of the inner check happened within
/// `window`, with no success in between
///
/// Failures older than `window` are forgotten and any success clears the
/// history. The most recent error is reported once tripped.
pub struct ThresholdChecker<C> {
    inner: C,
    window: Duration,
    threshold: usize,
    failures: Mutex<VecDeque<Instant>>,
}

impl<C: Checker> ThresholdChecker<C> {
    pub fn new(inner: C, window: Duration, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            inner,
            window,
            threshold,
            failures: Mutex::new(VecDeque::with_capacity(threshold)),
        }
    }

    /// Record a failure at `now` and return how many fall inside the window
    fn record_failure(&self, now: Instant) -> usize {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        while failures
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.window)
        {
            failures.pop_front();
        }
        failures.push_back(now);
        if failures.len() > self.threshold {
            failures.pop_front();
        }
        failures.len()
    }
}

#[async_trait]
impl<C: Checker> Checker for ThresholdChecker<C> {
    async fn check(&self) -> Result<(), CheckError> {
        match self.inner.check().await {
            Ok(()) => {
                self.failures
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clear();
                Ok(())
            }
            Err(e) => {
                let failures = self.record_failure(Instant::now());
                if failures >= self.threshold {
                    Err(e)
                } else {
                    debug!(
                        failures,
                        threshold = self.threshold,
                        window = ?self.window,
                        error = %e,
                        "Check failed below threshold"
                    );
                    Ok(())
                }
            }
        }
    }
}

/// Runs the inner check on a fixed interval and reports the latest result
///
/// The first run starts immediately. Until it completes the check fails with
/// [`PENDING_MESSAGE`]. The background task stops when the checker is dropped.
/// Must be created inside a tokio runtime.
pub struct PeriodicChecker {
    last: Arc<RwLock<Result<(), CheckError>>>,
    task: JoinHandle<()>,
}

impl PeriodicChecker {
    /// Periods shorter than one millisecond, zero included, are raised to it
    pub fn new<C: Checker + 'static>(inner: C, period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let last = Arc::new(RwLock::new(Err(CheckError::message(PENDING_MESSAGE))));

        let slot = Arc::clone(&last);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let result = inner.check().await;
                *slot.write().unwrap_or_else(|e| e.into_inner()) = result;
            }
        });

        Self { last, task }
    }
}

impl Drop for PeriodicChecker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl Checker for PeriodicChecker {
    async fn check(&self) -> Result<(), CheckError> {
        self.last.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Check evaluated every `period` that fails after `threshold` failures in a row
///
/// The failure window spans `threshold` periods, so a run of failing
/// evaluations always fits inside it.
pub fn periodic_threshold<C: Checker + 'static>(
    inner: C,
    period: Duration,
    threshold: usize,
) -> PeriodicChecker {
    let period = period.max(MIN_PERIOD);
    let window = period.saturating_mul(u32::try_from(threshold.max(1)).unwrap_or(u32::MAX));
    PeriodicChecker::new(ThresholdChecker::new(inner, window, threshold), period)
}

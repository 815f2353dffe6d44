//! Prometheus exposition of build metadata

use super::Info;
use chrono::DateTime;
use prometheus::{IntGaugeVec, Opts};

/// Name of the build info gauge
pub const BUILD_INFO_METRIC: &str = "buildmeta_info";

impl Info {
    /// A gauge carrying this build's metadata as labels
    ///
    /// The single sample is set to 1 and reflects the values at call time;
    /// register it once at startup:
    ///
    /// ```no_run
    /// # fn main() -> Result<(), prometheus::Error> {
    /// let registry = prometheus::Registry::new();
    /// registry.register(Box::new(buildmeta::Info::current().prometheus_collector()?))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn prometheus_collector(&self) -> Result<IntGaugeVec, prometheus::Error> {
        let gauge = IntGaugeVec::new(
            Opts::new(
                BUILD_INFO_METRIC,
                "Useful VCS/build info from the buildmeta library",
            ),
            &["commit", "commit_time", "tag", "build_time"],
        )?;

        let commit_time = unix_or_verbatim(&self.git_commit_time);
        let build_time = unix_or_verbatim(&self.build_time);
        gauge
            .with_label_values(&[
                self.git_commit.as_str(),
                commit_time.as_str(),
                self.git_tag.as_str(),
                build_time.as_str(),
            ])
            .set(1);

        Ok(gauge)
    }
}

/// RFC3339 timestamps become epoch seconds so PromQL time functions apply
fn unix_or_verbatim(value: &str) -> String {
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => t.timestamp().to_string(),
        Err(_) => value.to_string(),
    }
}

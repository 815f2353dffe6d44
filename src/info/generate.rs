//! Metadata generation from a local checkout

use super::git::{find_git_root, GitRepo};
use super::model::{scrub_credentials, NO_REMOTE_URL, NO_TAG_VALUE};
use super::toolchain::ToolchainProbe;
use super::Info;
use crate::error::{GenerateError, GitError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

/// Suffix marking a commit built from a modified working tree
pub const DIRTY_SUFFIX: &str = "-dirty";

/// Environment marker for continuous integration runs
const CI_ENV: &str = "CI";

/// Generator configuration
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Running under CI; suppresses the `-dirty` suffix
    pub ci: bool,
    pub toolchain: ToolchainProbe,
}

impl GeneratorConfig {
    /// Create config from environment variables
    ///
    /// Uses:
    /// - `CI` - any non-empty value marks a CI build
    pub fn from_env() -> Self {
        Self {
            ci: std::env::var(CI_ENV).is_ok_and(|v| !v.is_empty()),
            toolchain: ToolchainProbe::default(),
        }
    }
}

/// Generate metadata for the checkout containing `repo_path`
///
/// Configuration is read from the environment, see [`GeneratorConfig::from_env`].
pub fn generate(repo_path: impl AsRef<Path>) -> Result<Info, GenerateError> {
    generate_with(repo_path, &GeneratorConfig::from_env())
}

/// Generate metadata for the checkout containing `repo_path`
///
/// Either every field is resolved or the stage that failed is returned.
pub fn generate_with(
    repo_path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<Info, GenerateError> {
    let root = find_git_root(repo_path.as_ref());

    let repo = GitRepo::open(&root).map_err(|source| GenerateError::RepositoryOpen {
        path: root.clone(),
        source,
    })?;

    let head = repo.head().map_err(GenerateError::HeadResolution)?;

    let author_time = repo
        .author_time(&head)
        .map_err(GenerateError::CommitLoad)?;
    let commit_time = DateTime::parse_from_rfc3339(&author_time)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .map_err(|e| {
            GenerateError::CommitLoad(GitError::Output(format!(
                "bad author time {:?}: {}",
                author_time, e
            )))
        })?;

    let git_repo = match repo.first_remote_url() {
        Ok(Some(url)) => scrub_credentials(&url),
        Ok(None) => NO_REMOTE_URL.to_string(),
        Err(e) => {
            warn!(error = %e, "Could not read remotes");
            NO_REMOTE_URL.to_string()
        }
    };

    let git_tag = match repo.tags() {
        Ok(tags) => tags
            .into_iter()
            .find(|t| t.commit == head)
            .map(|t| t.name)
            .unwrap_or_else(|| NO_TAG_VALUE.to_string()),
        Err(e) => {
            warn!(error = %e, "Could not enumerate tags");
            NO_TAG_VALUE.to_string()
        }
    };

    let changed = repo
        .changed_paths()
        .map_err(GenerateError::WorktreeStatus)?;

    let mut git_commit = head;
    if !changed.is_empty() {
        debug!(changed = changed.len(), ci = config.ci, "Working tree has changes");
        if !config.ci {
            git_commit.push_str(DIRTY_SUFFIX);
        }
    }

    let toolchain = config.toolchain.version()?;

    let info = Info {
        git_commit,
        git_commit_time: commit_time,
        git_repo,
        git_tag,
        build_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        go_build_version: toolchain.raw,
        repo_path: Some(root),
    };

    info!(
        commit = %info.git_commit,
        tag = %info.git_tag,
        toolchain = %info.go_build_version,
        "Generated build metadata"
    );
    Ok(info)
}

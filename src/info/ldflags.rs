//! Rendering metadata for embedding into a compiled binary

use super::model::{
    ENV_BUILD_TIME, ENV_GIT_COMMIT, ENV_GIT_COMMIT_TIME, ENV_GIT_REPO, ENV_GIT_TAG,
    ENV_GO_BUILD_VERSION,
};
use super::toolchain::ToolchainProbe;
use super::Info;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical import path the `-X` flags target
pub const MODULE_PATH: &str = "github.com/andrewstuart/buildmeta";

/// Toolchain flag selecting module-aware builds
const MODULE_MODE_ENV: &str = "GO111MODULE";

/// Inputs to symbol path resolution, read from the environment by default
#[derive(Debug, Clone)]
pub struct SymbolPathEnv {
    /// Value of `GO111MODULE`, if set
    pub module_mode: Option<String>,
    /// Legacy source root (`$GOPATH/src`)
    pub legacy_src_root: Option<PathBuf>,
    pub toolchain: ToolchainProbe,
}

impl SymbolPathEnv {
    /// Uses `GO111MODULE`, then `GOPATH` falling back to `$HOME/go`
    pub fn from_env() -> Self {
        let gopath = std::env::var_os("GOPATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join("go")));

        Self {
            module_mode: std::env::var(MODULE_MODE_ENV).ok(),
            legacy_src_root: gopath.map(|p| p.join("src")),
            toolchain: ToolchainProbe::go(),
        }
    }
}

impl Info {
    /// `-X` linker flags setting every build variable, for the canonical module
    pub fn ldflags(&self) -> String {
        self.ldflags_for(MODULE_PATH, &SymbolPathEnv::from_env())
    }

    /// `-X` linker flags for `module_path`, resolved against `env`
    ///
    /// Always six space-joined `-X <path>.<name>=<value>` tokens in the order
    /// commit, commit time, repo, tag, build time, toolchain version.
    pub fn ldflags_for(&self, module_path: &str, env: &SymbolPathEnv) -> String {
        let p = self.symbol_path(module_path, env);

        [
            ("gitCommit", &self.git_commit),
            ("gitCommitTime", &self.git_commit_time),
            ("gitRepo", &self.git_repo),
            ("gitTag", &self.git_tag),
            ("buildTime", &self.build_time),
            ("goBuildVersion", &self.go_build_version),
        ]
        .iter()
        .map(|(name, value)| format!("-X {}.{}={}", p, name, value))
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// `cargo:rustc-env` directives for a host's `build.rs`
    ///
    /// The values are visible to that host crate only, through
    /// [`build_vars!`](crate::build_vars) expanded in its own code.
    pub fn rustc_env(&self) -> String {
        [
            (ENV_GIT_COMMIT, &self.git_commit),
            (ENV_GIT_COMMIT_TIME, &self.git_commit_time),
            (ENV_GIT_REPO, &self.git_repo),
            (ENV_GIT_TAG, &self.git_tag),
            (ENV_BUILD_TIME, &self.build_time),
            (ENV_GO_BUILD_VERSION, &self.go_build_version),
        ]
        .iter()
        .map(|(name, value)| format!("cargo:rustc-env={}={}\n", name, value))
        .collect()
    }

    /// Symbol path prefix for the `-X` flags
    ///
    /// A vendored copy of the module is only addressed by its vendor path
    /// when building outside module mode with a toolchain of 1.12 or older.
    /// Anything that cannot be determined falls back to `module_path`.
    pub fn symbol_path(&self, module_path: &str, env: &SymbolPathEnv) -> String {
        let Some(repo) = self.repo_path.as_deref() else {
            return module_path.to_string();
        };
        vendored_path(repo, module_path, env).unwrap_or_else(|| module_path.to_string())
    }
}

fn vendored_path(repo: &Path, module_path: &str, env: &SymbolPathEnv) -> Option<String> {
    let vendor = std::path::absolute(repo.join("vendor").join(module_path)).ok()?;
    if !vendor.is_dir() {
        return None;
    }
    if env.module_mode.as_deref() == Some("on") {
        return None;
    }

    let version = match env.toolchain.version() {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Toolchain version unavailable, using canonical symbol path");
            return None;
        }
    };
    if !version.at_most(1, 12) {
        return None;
    }

    let rel = vendor.strip_prefix(env.legacy_src_root.as_ref()?).ok()?;
    let rel = rel.to_str()?.replace(std::path::MAIN_SEPARATOR, "/");
    debug!(path = %rel, "Using vendored symbol path");
    Some(rel)
}

//! The build metadata record and its process-state constructor

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Tag value used when no tag points at the built commit
pub const NO_TAG_VALUE: &str = "NOT_TAGGED";

/// Repository URL used when the checkout has no configured remotes
pub const NO_REMOTE_URL: &str = "NO_GIT_REMOTES_FOUND";

/// Environment variable gating [`debug_dump_and_exit`]
pub const DEBUG_DUMP_ENV: &str = "BUILDMETA_TEST_DEBUG_AND_DIE";

/// Exact value [`DEBUG_DUMP_ENV`] must hold for the dump to happen
pub const DEBUG_DUMP_SENTINEL: &str = "yes-i-want-my-app-to-exit-fatally-immediately";

// Build variable names, shared with `Info::rustc_env`
pub(crate) const ENV_GIT_COMMIT: &str = "BUILDMETA_GIT_COMMIT";
pub(crate) const ENV_GIT_COMMIT_TIME: &str = "BUILDMETA_GIT_COMMIT_TIME";
pub(crate) const ENV_GIT_REPO: &str = "BUILDMETA_GIT_REPO";
pub(crate) const ENV_GIT_TAG: &str = "BUILDMETA_GIT_TAG";
pub(crate) const ENV_BUILD_TIME: &str = "BUILDMETA_BUILD_TIME";
pub(crate) const ENV_GO_BUILD_VERSION: &str = "BUILDMETA_GO_BUILD_VERSION";

/// Raw build variables injected into the process before it starts serving
///
/// Populated once at startup, either from values baked in at compile time
/// ([`BuildVars::compiled`]) or from the runtime environment
/// ([`BuildVars::from_env`]), then handed to [`Info::from_build_vars`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildVars {
    pub git_commit: String,
    pub git_commit_time: String,
    pub git_repo: String,
    pub git_tag: String,
    pub build_time: String,
    pub go_build_version: String,
}

impl BuildVars {
    /// Read build variables from the runtime environment
    ///
    /// Uses:
    /// - `BUILDMETA_GIT_COMMIT`, `BUILDMETA_GIT_COMMIT_TIME`, `BUILDMETA_GIT_REPO`
    /// - `BUILDMETA_GIT_TAG`, `BUILDMETA_BUILD_TIME`, `BUILDMETA_GO_BUILD_VERSION`
    ///
    /// Missing variables are left empty.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            git_commit: var(ENV_GIT_COMMIT),
            git_commit_time: var(ENV_GIT_COMMIT_TIME),
            git_repo: var(ENV_GIT_REPO),
            git_tag: var(ENV_GIT_TAG),
            build_time: var(ENV_BUILD_TIME),
            go_build_version: var(ENV_GO_BUILD_VERSION),
        }
    }

    /// Build variables that were set while compiling buildmeta itself
    ///
    /// Only sees values exported in the environment of the `cargo build`
    /// run. `cargo:rustc-env` lines printed by a host's `build.rs` reach the
    /// host crate alone; read those with [`build_vars!`](crate::build_vars).
    pub fn compiled() -> Self {
        crate::build_vars!()
    }

    /// Overlay every non-empty field of `other` onto `self`
    pub fn merge(mut self, other: BuildVars) -> Self {
        fn pick(slot: &mut String, value: String) {
            if !value.is_empty() {
                *slot = value;
            }
        }
        pick(&mut self.git_commit, other.git_commit);
        pick(&mut self.git_commit_time, other.git_commit_time);
        pick(&mut self.git_repo, other.git_repo);
        pick(&mut self.git_tag, other.git_tag);
        pick(&mut self.build_time, other.build_time);
        pick(&mut self.go_build_version, other.go_build_version);
        self
    }
}

/// Build variables embedded into the crate that invokes the macro
///
/// Expands `option_env!` in the caller, so it picks up the
/// `cargo:rustc-env` directives that the caller's own `build.rs` printed
/// from [`Info::rustc_env`]:
///
/// ```no_run
/// // build.rs
/// // print!("{}", buildmeta::generate(".")?.rustc_env());
///
/// // main.rs
/// let info = buildmeta::Info::current_with(buildmeta::build_vars!());
/// ```
#[macro_export]
macro_rules! build_vars {
    () => {
        $crate::info::BuildVars {
            git_commit: option_env!("BUILDMETA_GIT_COMMIT")
                .unwrap_or_default()
                .to_string(),
            git_commit_time: option_env!("BUILDMETA_GIT_COMMIT_TIME")
                .unwrap_or_default()
                .to_string(),
            git_repo: option_env!("BUILDMETA_GIT_REPO")
                .unwrap_or_default()
                .to_string(),
            git_tag: option_env!("BUILDMETA_GIT_TAG")
                .unwrap_or_default()
                .to_string(),
            build_time: option_env!("BUILDMETA_BUILD_TIME")
                .unwrap_or_default()
                .to_string(),
            go_build_version: option_env!("BUILDMETA_GO_BUILD_VERSION")
                .unwrap_or_default()
                .to_string(),
        }
    };
}

/// Build-time information about the running binary
///
/// Serializes to the `/-/info` JSON shape. `goBuildVersion` is omitted when
/// empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "commit")]
    pub git_commit: String,
    #[serde(rename = "commitTime")]
    pub git_commit_time: String,
    #[serde(rename = "gitRepo")]
    pub git_repo: String,
    #[serde(rename = "tag")]
    pub git_tag: String,
    #[serde(rename = "buildTime")]
    pub build_time: String,
    #[serde(
        rename = "goBuildVersion",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub go_build_version: String,

    /// Checkout the generator inspected; only used for symbol path resolution
    #[serde(skip)]
    pub(crate) repo_path: Option<PathBuf>,
}

/// Equality covers the served fields only
impl PartialEq for Info {
    fn eq(&self, other: &Self) -> bool {
        self.git_commit == other.git_commit
            && self.git_commit_time == other.git_commit_time
            && self.git_repo == other.git_repo
            && self.git_tag == other.git_tag
            && self.build_time == other.build_time
            && self.go_build_version == other.go_build_version
    }
}

impl Eq for Info {}

impl Info {
    /// Build the model from injected build variables
    ///
    /// The repository URL is scrubbed of any embedded credentials. This never
    /// fails: a URL that does not parse is kept as given.
    pub fn from_build_vars(vars: BuildVars) -> Self {
        Self {
            git_commit: vars.git_commit,
            git_commit_time: vars.git_commit_time,
            git_repo: scrub_credentials(&vars.git_repo),
            git_tag: vars.git_tag,
            build_time: vars.build_time,
            go_build_version: vars.go_build_version,
            repo_path: None,
        }
    }

    /// Metadata for the running process
    ///
    /// Values compiled into buildmeta itself, overridden by any non-empty
    /// runtime environment values. Binaries embedding metadata through a
    /// build script use [`Info::current_with`] instead.
    pub fn current() -> Self {
        Self::current_with(BuildVars::compiled())
    }

    /// Metadata from `compiled`, usually [`build_vars!`](crate::build_vars),
    /// overridden by any non-empty runtime environment values
    pub fn current_with(compiled: BuildVars) -> Self {
        Self::from_build_vars(compiled.merge(BuildVars::from_env()))
    }

    /// The tag if the build was tagged, otherwise the commit
    pub fn tag_or_commit(&self) -> &str {
        if self.git_tag != NO_TAG_VALUE {
            &self.git_tag
        } else {
            &self.git_commit
        }
    }
}

/// Strip userinfo from a URL so credentials never leak into metadata
///
/// Strings that are not absolute URLs (e.g. scp-style `git@host:path`
/// remotes) are returned unchanged.
pub fn scrub_credentials(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            // cannot-be-a-base URLs have no userinfo to strip
            if url.set_username("").is_ok() && url.set_password(None).is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        Err(e) => {
            debug!(error = %e, "Repository URL did not parse, keeping it verbatim");
            raw.to_string()
        }
    }
}

/// Whether the debug dump was requested through [`DEBUG_DUMP_ENV`]
pub fn debug_dump_requested() -> bool {
    std::env::var(DEBUG_DUMP_ENV).is_ok_and(|v| v == DEBUG_DUMP_SENTINEL)
}

/// Diagnostic escape hatch for checking what a binary was built with
///
/// If requested through [`DEBUG_DUMP_ENV`], writes `info` to stderr as
/// indented JSON and terminates the process with status 1. Otherwise returns
/// without doing anything. Host applications call this explicitly at startup.
pub fn debug_dump_and_exit(info: &Info) {
    if !debug_dump_requested() {
        return;
    }
    let mut stderr = std::io::stderr().lock();
    if let Ok(bs) = serde_json::to_vec_pretty(info) {
        let _ = stderr.write_all(&bs);
    }
    let _ = stderr.flush();
    std::process::exit(1);
}

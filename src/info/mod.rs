//! Build metadata
//!
//! - [`Info`] - the metadata record served at `/-/info`
//! - [`generate`] - derive it from a local git checkout at build time
//! - [`Info::ldflags`] / [`Info::rustc_env`] - embed it into a binary

mod generate;
mod git;
mod ldflags;
mod metrics;
mod model;
mod toolchain;

pub use generate::{generate, generate_with, GeneratorConfig, DIRTY_SUFFIX};
pub use git::{find_git_root, GitRepo, TagRef};
pub use ldflags::{SymbolPathEnv, MODULE_PATH};
pub use metrics::BUILD_INFO_METRIC;
pub use model::{
    debug_dump_and_exit, debug_dump_requested, scrub_credentials, BuildVars, Info,
    DEBUG_DUMP_ENV, DEBUG_DUMP_SENTINEL, NO_REMOTE_URL, NO_TAG_VALUE,
};
pub use toolchain::{parse_version, ToolchainProbe, ToolchainVersion};

#[cfg(test)]
#[path = "info_test.rs"]
mod tests;

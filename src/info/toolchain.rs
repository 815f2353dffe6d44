//! Toolchain version probing

use crate::error::{GenerateError, ToolchainError};
use std::process::Command;
use tracing::debug;

/// How to ask the toolchain for its version
///
/// Runs `program args...`, takes whitespace-delimited field `field` of the
/// combined output and strips `prefix` from it. `rustc --version` prints
/// `rustc 1.79.0 (129f3b996 2024-06-10)`; `go version` prints
/// `go version go1.12.17 linux/amd64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainProbe {
    pub program: String,
    pub args: Vec<String>,
    pub field: usize,
    pub prefix: String,
}

impl ToolchainProbe {
    /// `rustc --version`
    pub fn rustc() -> Self {
        Self {
            program: "rustc".to_string(),
            args: vec!["--version".to_string()],
            field: 1,
            prefix: String::new(),
        }
    }

    /// `go version`
    pub fn go() -> Self {
        Self {
            program: "go".to_string(),
            args: vec!["version".to_string()],
            field: 2,
            prefix: "go".to_string(),
        }
    }

    /// Run the probe and return the raw version token, e.g. `1.79.0` or `go1.12.17`
    pub fn version_token(&self) -> Result<String, ToolchainError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| ToolchainError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ToolchainError::Failed {
                program: self.program.clone(),
                code: output.status.code(),
                output: combined.trim().to_string(),
            });
        }

        let token = combined
            .split_whitespace()
            .nth(self.field)
            .ok_or_else(|| ToolchainError::TooFewFields {
                program: self.program.clone(),
                output: combined.trim().to_string(),
            })?;

        debug!(program = %self.program, token = %token, "Toolchain version probed");
        Ok(token.to_string())
    }

    /// Run the probe and parse `(major, minor)` from its version token
    pub fn version(&self) -> Result<ToolchainVersion, GenerateError> {
        let token = self
            .version_token()
            .map_err(GenerateError::ToolchainVersion)?;
        let version = parse_version(&token, &self.prefix)?;
        Ok(ToolchainVersion {
            raw: token,
            major: version.0,
            minor: version.1,
        })
    }
}

impl Default for ToolchainProbe {
    fn default() -> Self {
        Self::rustc()
    }
}

/// A probed toolchain version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainVersion {
    /// Token as printed by the toolchain, including any prefix
    pub raw: String,
    pub major: u64,
    pub minor: u64,
}

impl ToolchainVersion {
    /// True for versions up to and including `major.minor`
    pub fn at_most(&self, major: u64, minor: u64) -> bool {
        (self.major, self.minor) <= (major, minor)
    }
}

/// Parse `<prefix><major>.<minor>[...]`
///
/// Anything after the minor number (patch, pre-release, build suffix) is
/// ignored, so `go1.12rc1` and `1.79.0-nightly` both parse.
pub fn parse_version(token: &str, prefix: &str) -> Result<(u64, u64), GenerateError> {
    let parse_err = || GenerateError::ToolchainVersionParse {
        token: token.to_string(),
    };

    let rest = token.strip_prefix(prefix).ok_or_else(parse_err)?;
    let (major, rest) = rest.split_once('.').ok_or_else(parse_err)?;
    let minor_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    let major = major.parse::<u64>().map_err(|_| parse_err())?;
    let minor = rest[..minor_end].parse::<u64>().map_err(|_| parse_err())?;
    Ok((major, minor))
}

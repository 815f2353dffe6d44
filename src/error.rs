//! Error types for metadata generation and health checking

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failure running a single `git` command against a checkout
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("`git {args}` exited with {code:?}: {stderr}")]
    Failed {
        args: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("git produced unexpected output: {0}")]
    Output(String),
}

/// Failure determining the active toolchain version
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("error running {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error running {program}: exit {code:?}: {output}")]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("not enough fields returned by {program}: {output}")]
    TooFewFields { program: String, output: String },
}

/// Errors raised while generating metadata from a local checkout
///
/// Each variant names the stage that failed. Generation never returns a
/// partially populated model.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("could not open git repo at {}", .path.display())]
    RepositoryOpen {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    #[error("could not get current commit")]
    HeadResolution(#[source] GitError),

    #[error("could not load commit object for current head")]
    CommitLoad(#[source] GitError),

    #[error("could not get working tree status")]
    WorktreeStatus(#[source] GitError),

    #[error("could not determine toolchain version")]
    ToolchainVersion(#[source] ToolchainError),

    #[error("error scanning version numbers from {token:?}")]
    ToolchainVersionParse { token: String },
}

/// Returned by [`MetaChecker`](crate::health::MetaChecker) when the remote
/// readiness endpoint answers with a 4xx/5xx status.
///
/// The decoded body is kept so that registry reports can surface the
/// downstream service's own failure detail.
#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[error("{root:?} gave response code: {status_code} status: {status:?}")]
pub struct DownstreamError {
    pub status_code: u16,
    pub root: String,
    pub status: String,
    pub body: serde_json::Value,
}

/// Outcome of a remote readiness probe
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Downstream(#[from] DownstreamError),
}

/// Failure reported by a registered health check
///
/// Serializes untagged: downstream errors as their structured fields,
/// everything else as the error message.
#[derive(Debug, Clone, Error, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CheckError {
    #[error(transparent)]
    Downstream(DownstreamError),

    #[error("{0}")]
    Message(String),
}

impl CheckError {
    pub fn message(msg: impl Into<String>) -> Self {
        CheckError::Message(msg.into())
    }
}

impl From<anyhow::Error> for CheckError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DownstreamError>() {
            Ok(downstream) => CheckError::Downstream(downstream),
            Err(other) => CheckError::Message(format!("{:#}", other)),
        }
    }
}

impl From<ProbeError> for CheckError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Downstream(d) => CheckError::Downstream(d),
            ProbeError::Transport(e) => CheckError::Message(e.to_string()),
        }
    }
}

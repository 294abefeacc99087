//! Error taxonomy for a synchronisation run.
//!
//! Every variant is fatal: the pipeline has no degraded mode, so each error
//! aborts the run and is surfaced to the caller as-is. `Unchanged` is not an
//! error and never appears here.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Upstream unreachable, slow, or serving something we cannot read.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("fetch did not complete within {0:?}")]
    Timeout(Duration),

    #[error("upstream payload is not a valid emoji dataset: {0}")]
    Payload(String),

    #[error("no emoji dataset found in any of {scripts} client script(s)")]
    DatasetNotFound { scripts: usize },

    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A dataset entry (or the artifact itself) does not fit the mapping schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entry {index} in category '{category}' is not an object")]
    NotAnObject { category: String, index: usize },

    #[error("entry {index} in category '{category}' has no usable '{field}'")]
    MissingField {
        category: String,
        index: usize,
        field: &'static str,
    },

    #[error("'{name}' maps to both {first:?} and {second:?}")]
    DuplicateKey {
        name: String,
        first: String,
        second: String,
    },

    #[error("dataset contains no emoji entries")]
    Empty,

    #[error("artifact is not a valid emoji map: {0}")]
    Artifact(String),
}

/// Any step of the proposal procedure failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("could not run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("could not write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("candidate artifact is already present on the base branch, nothing to commit")]
    NothingToCommit,

    #[error("proposal branch '{0}' is the base branch; refusing to commit onto it")]
    BranchIsBase(String),

    #[error("git diff exited with {code:?}: {stderr}")]
    Diff { code: Option<i32>, stderr: String },

    #[error("pull request api request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("pull request api answered {status} for {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },
}

/// Top-level failure of a run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("could not access artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("publishing requires {0}")]
    NotConfigured(&'static str),
}

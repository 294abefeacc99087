//! # contract: the seams of the synchronisation pipeline
//!
//! Every component that talks to the outside world sits behind a trait here,
//! so the orchestration in [`crate::synchronise`] and the proposal procedure in
//! [`crate::publish`] can be driven by real clients in production and by
//! `mockall` mocks in tests.
//!
//! - [`Fetcher`]: retrieves the raw upstream dataset.
//! - [`Publisher`]: turns a changed artifact into a rolling pull request.
//! - [`GitWorkspace`]: local git operations used by the publisher.
//! - [`PullRequestApi`]: the hosting service's pull request endpoints.
//!
//! The mocks (`MockFetcher`, `MockPublisher`, ...) are exported under the
//! `test-export-mocks` feature so integration tests can use them.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::diff::ChangeSet;
use crate::error::{FetchError, PublishError};

/// Upstream dataset as fetched: category name -> raw entries.
///
/// Only the outer shape is checked here. Whether each entry carries the
/// fields the map needs is the normalizer's call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    categories: BTreeMap<String, Vec<serde_json::Value>>,
}

impl RawDataset {
    pub fn new(categories: BTreeMap<String, Vec<serde_json::Value>>) -> Self {
        Self { categories }
    }

    pub fn from_json(text: &str) -> Result<Self, FetchError> {
        serde_json::from_str(text)
            .map(Self::new)
            .map_err(|e| FetchError::Payload(e.to_string()))
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[serde_json::Value])> {
        self.categories
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Number of top-level entries, not counting skin-tone variations.
    pub fn entry_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

/// The single live proposal for pending emoji map updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestHandle {
    pub branch: String,
    pub number: u64,
    pub url: String,
    /// `false` when an already open pull request was reused.
    pub created: bool,
    /// Head commit of the proposal branch.
    pub commit: String,
}

/// Body of a pull request creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Retrieves the canonical emoji dataset. One attempt per run, never retried.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<RawDataset, FetchError>;
}

/// Proposes a changed artifact for review.
///
/// Implementations must converge: publishing twice leaves exactly one branch
/// and one open pull request behind.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, change: &ChangeSet) -> Result<PullRequestHandle, PublishError>;
}

/// Local repository operations. Paths are relative to the repository root.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait GitWorkspace: Send + Sync {
    /// Point `branch` at the tip of `base` on the remote and check it out,
    /// discarding whatever the branch held before.
    fn prepare_branch(&self, branch: &str, base: &str) -> Result<(), PublishError>;

    fn write_artifact(&self, path: &Path, bytes: &[u8]) -> Result<(), PublishError>;

    /// Stage `path` and create a signed commit. Returns the commit id.
    fn commit_signed(&self, path: &Path, message: &str) -> Result<String, PublishError>;

    /// Push `branch`, replacing any previous state of it on the remote.
    fn force_push(&self, branch: &str) -> Result<(), PublishError>;
}

/// Pull request endpoints of the hosting service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    async fn default_branch(&self) -> Result<String, PublishError>;

    /// The open pull request whose head is `branch`, if any.
    async fn find_open(&self, branch: &str) -> Result<Option<PullRequestHandle>, PublishError>;

    async fn open(&self, request: &NewPullRequest) -> Result<PullRequestHandle, PublishError>;

    /// Replace the description of pull request `number`.
    async fn update_body(&self, number: u64, body: &str) -> Result<(), PublishError>;
}

//! Coordinating module for the fetch-normalize-compare-publish pipeline.

use std::path::Path;

use tracing::{debug, error, info};

use crate::artifact;
use crate::config::SyncConfig;
use crate::contract::{Fetcher, PullRequestHandle, Publisher};
use crate::diff::{self, ChangeSet, MapDiff, Verdict};
use crate::error::SyncError;
use crate::fetch::HttpFetcher;
use crate::normalize::Normalizer;
use crate::publish::ChangePublisher;

/// What a run does once the DiffGate has spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report only.
    Check,
    /// Write the candidate over the local artifact.
    Update,
    /// Propose the candidate through the rolling pull request.
    Sync,
}

/// Side effect applied to a changed artifact.
pub enum Action<'a> {
    Report,
    WriteLocal,
    Publish(&'a dyn Publisher),
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub verdict: Verdict,
    pub total: usize,
    pub summary: MapDiff,
    pub sha256: String,
    /// The local artifact was replaced.
    pub written: bool,
    pub proposal: Option<PullRequestHandle>,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.verdict == Verdict::Changed
    }

    /// `changed=true|false`, the line downstream automation keys on.
    pub fn signal(&self) -> String {
        format!("changed={}", self.changed())
    }
}

/// Fetch, normalize and compare against the committed artifact at
/// `committed`. Pure apart from the fetch and one file read.
pub async fn detect(
    fetcher: &dyn Fetcher,
    normalizer: &Normalizer,
    committed: &Path,
) -> Result<ChangeSet, SyncError> {
    info!("[SYNC] Fetching upstream dataset");
    let raw = fetcher.fetch().await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Fetch failed");
        e
    })?;
    info!(entries = raw.entry_count(), "[SYNC] Fetch succeeded");

    let map = normalizer.normalize(&raw).map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Dataset does not fit the emoji map schema");
        e
    })?;
    let candidate = map.to_artifact(normalizer.layout());
    debug!(size = candidate.len(), "[SYNC] Serialized candidate artifact");

    let previous = artifact::read_committed(committed).map_err(|source| {
        error!(path = %committed.display(), error = %source, "[SYNC][ERROR] Could not read committed artifact");
        SyncError::Artifact {
            path: committed.to_path_buf(),
            source,
        }
    })?;

    let change = diff::compare(&candidate, previous.as_deref())?;
    info!(
        verdict = ?change.verdict,
        added = change.summary.added.len(),
        removed = change.summary.removed.len(),
        modified = change.summary.modified.len(),
        total = change.total,
        "[SYNC] DiffGate verdict"
    );
    Ok(change)
}

/// Run the whole pipeline once with explicit components. Nothing past the
/// DiffGate runs when the verdict is [`Verdict::Unchanged`].
pub async fn run_pipeline(
    fetcher: &dyn Fetcher,
    normalizer: &Normalizer,
    committed: &Path,
    action: Action<'_>,
) -> Result<SyncReport, SyncError> {
    let change = detect(fetcher, normalizer, committed).await?;
    let mut report = SyncReport {
        verdict: change.verdict,
        total: change.total,
        summary: change.summary.clone(),
        sha256: change.sha256(),
        written: false,
        proposal: None,
    };

    if !change.is_changed() {
        info!("[SYNC] Emoji map is up to date, nothing to do");
        return Ok(report);
    }

    match action {
        Action::Report => info!("[SYNC] Emoji map changed, report only"),
        Action::WriteLocal => {
            artifact::write_atomic(committed, &change.candidate).map_err(|source| {
                error!(path = %committed.display(), error = %source, "[SYNC][ERROR] Could not write artifact");
                SyncError::Artifact {
                    path: committed.to_path_buf(),
                    source,
                }
            })?;
            report.written = true;
        }
        Action::Publish(publisher) => {
            info!("[SYNC] Publishing changed emoji map");
            let handle = publisher.publish(&change).await.map_err(|e| {
                error!(error = %e, "[SYNC][ERROR] Publish failed");
                e
            })?;
            info!(number = handle.number, url = %handle.url, created = handle.created, "[SYNC] Proposal is up to date");
            report.proposal = Some(handle);
        }
    }
    Ok(report)
}

/// Entrypoint: build the production components from `config` and run once.
pub async fn synchronise(config: &SyncConfig, mode: Mode) -> Result<SyncReport, SyncError> {
    info!(?mode, "[SYNC] Starting emoji map synchronisation");
    let fetcher = HttpFetcher::new(config.source.clone(), &config.fetch)?;
    let normalizer = Normalizer::new(config.artifact.layout);
    let committed = config.artifact_path();

    match mode {
        Mode::Check => run_pipeline(&fetcher, &normalizer, &committed, Action::Report).await,
        Mode::Update => run_pipeline(&fetcher, &normalizer, &committed, Action::WriteLocal).await,
        Mode::Sync => {
            let publish = config
                .publish
                .as_ref()
                .ok_or(SyncError::NotConfigured("a publish section in the config"))?;
            let credentials = config
                .credentials
                .as_ref()
                .ok_or(SyncError::NotConfigured("a token and a signing key"))?;
            let publisher = ChangePublisher::github(
                publish,
                &config.repository,
                &config.artifact.path,
                credentials,
            )?;
            run_pipeline(&fetcher, &normalizer, &committed, Action::Publish(&publisher)).await
        }
    }
}

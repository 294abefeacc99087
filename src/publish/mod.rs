//! # publish: proposing a changed artifact for review
//!
//! A changed artifact is never committed to the base branch directly. It goes
//! into one signed commit on a fixed branch, which is reset onto the base and
//! force-pushed on every run, and one pull request from that branch. A
//! rerun therefore replaces the previous proposal instead of stacking a new
//! one next to it.

pub mod git;
pub mod github;

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::{Credentials, PublishConfig};
use crate::contract::{GitWorkspace, NewPullRequest, PullRequestApi, PullRequestHandle, Publisher};
use crate::diff::ChangeSet;
use crate::error::PublishError;

pub use git::{Author, GitCli, SigningIdentity};
pub use github::GitHubClient;

/// The single pending proposal, identified by its branch name.
///
/// [`RollingProposal::converge`] is the whole proposal procedure: whatever
/// the branch and its pull request looked like before, afterwards the branch
/// holds exactly one signed commit over the base and exactly one open pull
/// request describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingProposal {
    branch: String,
}

impl RollingProposal {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Reset the branch onto the base, commit the candidate, force-push and
    /// open or refresh the pull request. Every step is fatal.
    pub async fn converge<G, P>(
        &self,
        git: &G,
        api: &P,
        settings: &ProposalSettings,
        change: &ChangeSet,
    ) -> Result<PullRequestHandle, PublishError>
    where
        G: GitWorkspace + ?Sized,
        P: PullRequestApi + ?Sized,
    {
        let branch = self.branch();
        let base = match &settings.base_branch {
            Some(base) => base.clone(),
            None => api.default_branch().await?,
        };
        if base == branch {
            error!(branch, "[PUBLISH][ERROR] Proposal branch is the base branch");
            return Err(PublishError::BranchIsBase(base));
        }
        info!(branch, base = %base, "[PUBLISH] Converging rolling proposal");

        git.prepare_branch(branch, &base)?;
        git.write_artifact(&settings.artifact_path, &change.candidate)?;
        let commit = git.commit_signed(&settings.artifact_path, &settings.commit_message)?;
        git.force_push(branch).map_err(|e| {
            error!(error = %e, "[PUBLISH][ERROR] Push failed, not touching pull requests");
            e
        })?;
        info!(branch, commit = %commit, "[PUBLISH] Branch updated");

        let body = render_body(&settings.body, change);
        if let Some(existing) = api.find_open(branch).await? {
            api.update_body(existing.number, &body).await?;
            info!(number = existing.number, url = %existing.url, "[PUBLISH] Reusing open pull request");
            return Ok(PullRequestHandle {
                created: false,
                commit,
                ..existing
            });
        }

        let request = NewPullRequest {
            head: branch.to_string(),
            base,
            title: settings.title.clone(),
            body,
        };
        let opened = api.open(&request).await?;
        info!(number = opened.number, url = %opened.url, "[PUBLISH] Opened pull request");
        Ok(PullRequestHandle {
            created: true,
            commit,
            ..opened
        })
    }
}

/// Text and targets of the proposal.
#[derive(Debug, Clone)]
pub struct ProposalSettings {
    /// Base branch; the repository default when `None`.
    pub base_branch: Option<String>,
    /// Artifact location relative to the repository root.
    pub artifact_path: PathBuf,
    pub commit_message: String,
    pub title: String,
    pub body: String,
}

/// [`Publisher`] that converges the repository on one branch and one open
/// pull request carrying the candidate artifact.
pub struct ChangePublisher<G, P> {
    git: G,
    api: P,
    proposal: RollingProposal,
    settings: ProposalSettings,
}

impl<G: GitWorkspace, P: PullRequestApi> ChangePublisher<G, P> {
    pub fn new(git: G, api: P, proposal: RollingProposal, settings: ProposalSettings) -> Self {
        Self {
            git,
            api,
            proposal,
            settings,
        }
    }

    pub fn proposal(&self) -> &RollingProposal {
        &self.proposal
    }
}

impl ChangePublisher<GitCli, GitHubClient> {
    /// Publisher for a GitHub-hosted checkout at `repository`.
    pub fn github(
        publish: &PublishConfig,
        repository: impl Into<PathBuf>,
        artifact_path: impl Into<PathBuf>,
        credentials: &Credentials,
    ) -> Result<Self, PublishError> {
        let git = GitCli::new(
            repository,
            publish.remote.clone(),
            credentials.token.clone(),
            SigningIdentity {
                key: credentials.signing_key.clone(),
                format: publish.signing_format,
            },
            Author {
                name: publish.author_name.clone(),
                email: publish.author_email.clone(),
            },
        );
        let api = GitHubClient::new(
            &publish.api_base,
            publish.owner(),
            publish.name(),
            credentials.token.clone(),
        )?;
        Ok(Self::new(
            git,
            api,
            RollingProposal::new(publish.branch.clone()),
            ProposalSettings {
                base_branch: publish.base_branch.clone(),
                artifact_path: artifact_path.into(),
                commit_message: publish.commit_message.clone(),
                title: publish.title.clone(),
                body: publish.body.clone(),
            },
        ))
    }
}

#[async_trait]
impl<G: GitWorkspace, P: PullRequestApi> Publisher for ChangePublisher<G, P> {
    async fn publish(&self, change: &ChangeSet) -> Result<PullRequestHandle, PublishError> {
        self.proposal
            .converge(&self.git, &self.api, &self.settings, change)
            .await
    }
}

/// Fill `{added}`, `{removed}`, `{modified}`, `{total}` and `{sha256}` in a
/// pull request body template.
pub fn render_body(template: &str, change: &ChangeSet) -> String {
    template
        .replace("{added}", &change.summary.added.len().to_string())
        .replace("{removed}", &change.summary.removed.len().to_string())
        .replace("{modified}", &change.summary.modified.len().to_string())
        .replace("{total}", &change.total.to_string())
        .replace("{sha256}", &change.sha256())
}

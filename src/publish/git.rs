//! Local repository operations through the `git` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, error, info};

use crate::artifact;
use crate::config::SigningFormat;
use crate::contract::GitWorkspace;
use crate::error::PublishError;

/// Key and format git signs the proposal commit with.
#[derive(Clone)]
pub struct SigningIdentity {
    pub key: String,
    pub format: SigningFormat,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("key", &"<redacted>")
            .field("format", &self.format)
            .finish()
    }
}

/// Committer shown on the proposal commit. Falls back to the repository's
/// own git config when unset.
#[derive(Debug, Clone, Default)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// [`GitWorkspace`] backed by a checkout at `workdir`.
pub struct GitCli {
    workdir: PathBuf,
    remote: String,
    token: String,
    signing: SigningIdentity,
    author: Author,
}

impl GitCli {
    pub fn new(
        workdir: impl Into<PathBuf>,
        remote: impl Into<String>,
        token: impl Into<String>,
        signing: SigningIdentity,
        author: Author,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            remote: remote.into(),
            token: token.into(),
            signing,
            author,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.workdir);
        cmd
    }

    /// Token as an http header, so it never lands in the remote URL or in
    /// the repository config.
    fn auth_header(&self) -> String {
        let credentials = STANDARD.encode(format!("x-access-token:{}", self.token));
        format!("http.extraheader=AUTHORIZATION: basic {credentials}")
    }

    /// Run `cmd`; `label` is what gets logged and reported, never the full
    /// argument list, which may carry the token.
    fn run(&self, label: &str, mut cmd: Command) -> Result<Output, PublishError> {
        debug!(command = label, workdir = %self.workdir.display(), "Running git");
        let output = cmd.output().map_err(PublishError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(command = label, %stderr, "git command failed");
            return Err(PublishError::Git {
                command: label.to_string(),
                stderr,
            });
        }
        Ok(output)
    }

    /// `git diff --cached --quiet`: 0 is a clean index, 1 a staged change,
    /// anything else a git failure.
    fn has_staged_changes(&self) -> Result<bool, PublishError> {
        let output = self
            .command()
            .args(["diff", "--cached", "--quiet"])
            .output()
            .map_err(PublishError::Spawn)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                error!(command = "diff", ?code, %stderr, "git command failed");
                Err(PublishError::Diff { code, stderr })
            }
        }
    }

    fn head_commit(&self) -> Result<String, PublishError> {
        let mut cmd = self.command();
        cmd.args(["rev-parse", "HEAD"]);
        let output = self.run("rev-parse", cmd)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl GitWorkspace for GitCli {
    fn prepare_branch(&self, branch: &str, base: &str) -> Result<(), PublishError> {
        let mut fetch = self.command();
        fetch
            .arg("-c")
            .arg(self.auth_header())
            .args(["fetch", "--quiet"])
            .arg(&self.remote)
            .arg(base);
        self.run("fetch", fetch)?;

        let mut checkout = self.command();
        checkout.args(["checkout", "--quiet", "-B", branch, "FETCH_HEAD"]);
        self.run("checkout", checkout)?;

        info!(branch, base, remote = %self.remote, "Reset proposal branch onto base");
        Ok(())
    }

    fn write_artifact(&self, path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
        let target = self.workdir.join(path);
        artifact::write_atomic(&target, bytes).map_err(|source| PublishError::Write {
            path: target.clone(),
            source,
        })
    }

    fn commit_signed(&self, path: &Path, message: &str) -> Result<String, PublishError> {
        let mut add = self.command();
        add.args(["add", "--"]).arg(path);
        self.run("add", add)?;

        if !self.has_staged_changes()? {
            info!(path = %path.display(), "Artifact on base branch already matches candidate");
            return Err(PublishError::NothingToCommit);
        }

        let mut commit = self.command();
        commit
            .arg("-c")
            .arg(format!("user.signingkey={}", self.signing.key))
            .arg("-c")
            .arg(format!("gpg.format={}", self.signing.format.as_git_value()));
        if let Some(name) = &self.author.name {
            commit.arg("-c").arg(format!("user.name={name}"));
        }
        if let Some(email) = &self.author.email {
            commit.arg("-c").arg(format!("user.email={email}"));
        }
        commit.args(["commit", "--quiet", "-S", "-m", message]);
        self.run("commit", commit)?;

        let id = self.head_commit()?;
        info!(commit = %id, format = self.signing.format.as_git_value(), "Created signed commit");
        Ok(id)
    }

    fn force_push(&self, branch: &str) -> Result<(), PublishError> {
        let mut push = self.command();
        push.arg("-c")
            .arg(self.auth_header())
            .args(["push", "--quiet", "--force"])
            .arg(&self.remote)
            .arg(format!("HEAD:refs/heads/{branch}"));
        self.run("push", push)?;
        info!(branch, remote = %self.remote, "Force-pushed proposal branch");
        Ok(())
    }
}

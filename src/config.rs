// emoji-map-sync/src/config.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::emoji::ArtifactLayout;

pub const DEFAULT_LOGIN_URL: &str = "https://discord.com/login";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "emoji-map-update";
pub const DEFAULT_TITLE: &str = "Update emoji map";
pub const DEFAULT_BODY: &str = "Automated update of the emoji map from the upstream dataset.\n\n\
     - added: {added}\n\
     - removed: {removed}\n\
     - modified: {modified}\n\
     - total entries: {total}\n\
     - artifact sha256: `{sha256}`\n";

/// Everything one run needs, secrets included. Built by
/// [`crate::load_config::load_config`] at the start of a run and dropped at
/// the end of it.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root of the repository holding the artifact.
    pub repository: PathBuf,
    pub source: SourceAction,
    pub fetch: FetchConfig,
    pub artifact: ArtifactConfig,
    pub publish: Option<PublishConfig>,
    pub credentials: Option<Credentials>,
}

impl SyncConfig {
    /// Absolute-or-cwd-relative location of the committed artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.repository.join(&self.artifact.path)
    }

    pub fn trace_loaded(&self) {
        info!(
            repository = %self.repository.display(),
            artifact = %self.artifact.path.display(),
            layout = ?self.artifact.layout,
            publish = self.publish.is_some(),
            credentials = self.credentials.is_some(),
            "Loaded SyncConfig"
        );
        self.source.trace_loaded();
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

/// Where the canonical dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceAction {
    /// Scrape the dataset out of the Discord web client's scripts.
    DiscordClient(DiscordClientSource),
    /// Download the raw category object from a plain JSON endpoint.
    Json(JsonSource),
}

impl SourceAction {
    pub fn trace_loaded(&self) {
        match self {
            SourceAction::DiscordClient(s) => {
                info!(login_url = %s.login_url, "Loaded Discord client source")
            }
            SourceAction::Json(s) => info!(url = %s.url, "Loaded JSON source"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordClientSource {
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

impl Default for DiscordClientSource {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSource {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Upper bound for each request and for the fetch as a whole.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Discord serves the client scripts to an empty user agent.
    #[serde(default)]
    pub user_agent: String,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Relative to the repository root.
    pub path: PathBuf,
    #[serde(default)]
    pub layout: ArtifactLayout,
}

/// How the rolling proposal is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// `owner/name` on the hosting service.
    pub github_repository: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Fixed name of the single proposal branch.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Defaults to the repository's default branch.
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default = "default_title")]
    pub commit_message: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Template; see [`crate::publish::render_body`] for placeholders.
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub signing_format: SigningFormat,
}

impl PublishConfig {
    /// Owner part of `github_repository`, used to qualify the PR head.
    pub fn owner(&self) -> &str {
        self.slug().0
    }

    pub fn name(&self) -> &str {
        self.slug().1
    }

    fn slug(&self) -> (&str, &str) {
        self.github_repository
            .split_once('/')
            .unwrap_or((self.github_repository.as_str(), ""))
    }
}

/// Which `gpg.format` git uses for the signing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningFormat {
    #[default]
    Openpgp,
    Ssh,
    X509,
}

impl SigningFormat {
    pub fn as_git_value(self) -> &'static str {
        match self {
            SigningFormat::Openpgp => "openpgp",
            SigningFormat::Ssh => "ssh",
            SigningFormat::X509 => "x509",
        }
    }
}

/// Access token and signing key supplied from outside for this run only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    /// Key id (openpgp, x509) or key path (ssh) handed to `user.signingkey`.
    pub signing_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_body() -> String {
    DEFAULT_BODY.to_string()
}

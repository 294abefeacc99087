//! # load_config: YAML settings plus secrets from the environment
//!
//! The YAML file holds everything that can be committed: where the upstream
//! dataset comes from, where the artifact lives, how the proposal is named
//! and signed. It never holds secrets. The token and signing key are read
//! from the environment at load time:
//!
//! - `EMOJI_SYNC_GITHUB_TOKEN`, falling back to `GITHUB_TOKEN`
//! - `EMOJI_SYNC_SIGNING_KEY`
//!
//! Credentials are only attached when both are present. `check` and `update`
//! run without them; [`load_config_for_publish`] refuses to continue when
//! they or the `publish` section are missing.
//!
//! Settings are validated here so a bad config fails before any network
//! access: the artifact path must be relative, the timeout non-zero, the
//! repository slug `owner/name`, and the proposal branch distinct from a
//! configured base branch.

use crate::config::{
    ArtifactConfig, Credentials, FetchConfig, PublishConfig, SourceAction, SyncConfig,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const TOKEN_ENV: &str = "EMOJI_SYNC_GITHUB_TOKEN";
pub const FALLBACK_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const SIGNING_KEY_ENV: &str = "EMOJI_SYNC_SIGNING_KEY";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    #[serde(default = "default_repository")]
    repository: PathBuf,
    source: SourceAction,
    #[serde(default)]
    fetch: FetchConfig,
    artifact: ArtifactConfig,
    #[serde(default)]
    publish: Option<PublishConfig>,
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}

/// Loads a static YAML config file (no secrets) and picks up the token and
/// signing key from the environment when both are present.
/// Returns a fully merged SyncConfig or an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    validate(&static_conf)?;

    let credentials = credentials_from_env();
    if static_conf.publish.is_some() && credentials.is_none() {
        warn!("Publish section present but credentials are not set; only check and update will work");
    }

    let config = SyncConfig {
        repository: static_conf.repository,
        source: static_conf.source,
        fetch: static_conf.fetch,
        artifact: static_conf.artifact,
        publish: static_conf.publish,
        credentials,
    };
    config.trace_loaded();
    Ok(config)
}

fn validate(conf: &StaticConfig) -> Result<()> {
    if conf.artifact.path.as_os_str().is_empty() || conf.artifact.path.is_absolute() {
        error!(path = %conf.artifact.path.display(), "artifact.path must be relative to the repository");
        anyhow::bail!(
            "artifact.path must be a non-empty path relative to the repository, got {:?}",
            conf.artifact.path
        );
    }
    if conf.fetch.timeout_secs == 0 {
        error!("fetch.timeout_secs must be positive");
        anyhow::bail!("fetch.timeout_secs must be positive");
    }
    if let Some(publish) = &conf.publish {
        if publish.owner().is_empty() || publish.name().is_empty() {
            error!(github_repository = %publish.github_repository, "Invalid publish.github_repository");
            anyhow::bail!(
                "publish.github_repository must look like owner/name, got {:?}",
                publish.github_repository
            );
        }
        if publish.branch.trim().is_empty() {
            anyhow::bail!("publish.branch must not be empty");
        }
        if publish.base_branch.as_deref() == Some(publish.branch.as_str()) {
            anyhow::bail!("publish.branch and publish.base_branch must differ");
        }
    }
    Ok(())
}

/// Token and signing key, or `None` unless both are set.
fn credentials_from_env() -> Option<Credentials> {
    let token = env_var(TOKEN_ENV).or_else(|| env_var(FALLBACK_TOKEN_ENV));
    let signing_key = env_var(SIGNING_KEY_ENV);
    match (token, signing_key) {
        (Some(token), Some(signing_key)) => {
            info!("Publishing credentials found in env");
            Some(Credentials { token, signing_key })
        }
        (token, key) => {
            info!(
                token = token.is_some(),
                signing_key = key.is_some(),
                "Publishing credentials incomplete in env"
            );
            None
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Like [`load_config`], but fails unless credentials are present.
pub fn load_config_for_publish<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let config = load_config(path)?;
    if config.publish.is_none() {
        anyhow::bail!("Config has no publish section");
    }
    config
        .credentials
        .as_ref()
        .with_context(|| {
            format!("{TOKEN_ENV} (or {FALLBACK_TOKEN_ENV}) and {SIGNING_KEY_ENV} must be set")
        })?;
    Ok(config)
}

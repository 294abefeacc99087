use std::env;
use std::fs::write;
use std::path::PathBuf;

use emoji_map_sync::config::{SigningFormat, SourceAction, DEFAULT_BRANCH, DEFAULT_LOGIN_URL};
use emoji_map_sync::emoji::ArtifactLayout;
use emoji_map_sync::load_config::{
    load_config, load_config_for_publish, FALLBACK_TOKEN_ENV, SIGNING_KEY_ENV, TOKEN_ENV,
};
use serial_test::serial;
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"
repository: ./library
source:
  type: discord_client
fetch:
  timeout_secs: 10
artifact:
  path: PyDrocsid/emoji_map.json
publish:
  github_repository: PyDrocsid/library
  base_branch: develop
  signing_format: ssh
  author_name: Emoji Bot
"#;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

fn clear_env() {
    for var in [TOKEN_ENV, FALLBACK_TOKEN_ENV, SIGNING_KEY_ENV] {
        env::remove_var(var);
    }
}

/// A static config plus env secrets produces a complete SyncConfig.
#[test]
#[serial]
fn static_config_and_env_secrets_are_merged() {
    clear_env();
    env::set_var(TOKEN_ENV, "ghp_primary");
    env::set_var(FALLBACK_TOKEN_ENV, "ghp_fallback");
    env::set_var(SIGNING_KEY_ENV, "/keys/bot");

    let file = config_file(FULL_CONFIG);
    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.repository, PathBuf::from("./library"));
    assert_eq!(config.artifact_path(), PathBuf::from("./library/PyDrocsid/emoji_map.json"));
    assert_eq!(config.artifact.layout, ArtifactLayout::Flat);
    assert_eq!(config.fetch.timeout_secs, 10);
    assert_eq!(config.fetch.user_agent, "");
    match &config.source {
        SourceAction::DiscordClient(source) => assert_eq!(source.login_url, DEFAULT_LOGIN_URL),
        other => panic!("unexpected source {other:?}"),
    }

    let publish = config.publish.as_ref().expect("publish section");
    assert_eq!(publish.branch, DEFAULT_BRANCH);
    assert_eq!(publish.base_branch.as_deref(), Some("develop"));
    assert_eq!(publish.signing_format, SigningFormat::Ssh);
    assert_eq!(publish.author_name.as_deref(), Some("Emoji Bot"));

    let credentials = config.credentials.as_ref().expect("credentials from env");
    assert_eq!(credentials.token, "ghp_primary");
    assert_eq!(credentials.signing_key, "/keys/bot");
    clear_env();
}

#[test]
#[serial]
fn github_token_is_used_as_fallback() {
    clear_env();
    env::set_var(FALLBACK_TOKEN_ENV, "ghp_fallback");
    env::set_var(SIGNING_KEY_ENV, "ABCDEF");

    let file = config_file(FULL_CONFIG);
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.credentials.unwrap().token, "ghp_fallback");
    clear_env();
}

#[test]
#[serial]
fn check_and_update_work_without_credentials() {
    clear_env();
    let file = config_file(
        r#"
source:
  type: json
  url: https://example.test/emoji.json
artifact:
  path: emoji_map.json
  layout: categorized
"#,
    );
    let config = load_config(file.path()).expect("no secrets needed");
    assert!(config.credentials.is_none());
    assert!(config.publish.is_none());
    assert_eq!(config.repository, PathBuf::from("."));
    assert_eq!(config.artifact.layout, ArtifactLayout::Categorized);
    assert_eq!(config.fetch.timeout_secs, 30);
}

#[test]
#[serial]
fn publishing_requires_both_secrets() {
    clear_env();
    env::set_var(TOKEN_ENV, "ghp_primary");

    let file = config_file(FULL_CONFIG);
    let err = load_config_for_publish(file.path()).unwrap_err();
    assert!(err.to_string().contains(SIGNING_KEY_ENV));
    clear_env();
}

#[test]
#[serial]
fn invalid_settings_are_rejected() {
    clear_env();
    let cases = [
        // absolute artifact path
        "source:\n  type: discord_client\nartifact:\n  path: /etc/emoji_map.json\n",
        // repository slug without owner
        "source:\n  type: discord_client\nartifact:\n  path: a.json\npublish:\n  github_repository: library\n",
        // proposal branch equal to base
        "source:\n  type: discord_client\nartifact:\n  path: a.json\npublish:\n  github_repository: o/r\n  branch: main\n  base_branch: main\n",
        // unknown source type
        "source:\n  type: ftp\nartifact:\n  path: a.json\n",
        // zero timeout
        "source:\n  type: discord_client\nfetch:\n  timeout_secs: 0\nartifact:\n  path: a.json\n",
    ];
    for yaml in cases {
        let file = config_file(yaml);
        assert!(load_config(file.path()).is_err(), "should reject:\n{yaml}");
    }
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    assert!(load_config("/nonexistent/emoji-sync.yaml").is_err());
}

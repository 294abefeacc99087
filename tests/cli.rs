use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATASET: &str = r#"{"people":[{"names":["smile"],"surrogates":"🙂"},{"names":["wink"],"surrogates":"😉"}]}"#;

async fn upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/emoji.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DATASET))
        .mount(&server)
        .await;
    server
}

/// Config for a repository at `root` pulling from the mock upstream.
fn write_config(root: &std::path::Path, server: &MockServer) -> std::path::PathBuf {
    let config = root.join("emoji-sync.yaml");
    fs::write(
        &config,
        format!(
            "repository: {}\nsource:\n  type: json\n  url: {}/emoji.json\nartifact:\n  path: emoji_map.json\n",
            root.display(),
            server.uri()
        ),
    )
    .unwrap();
    config
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("emoji-map-sync")
        .expect("Binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("check")
                .and(predicate::str::contains("update"))
                .and(predicate::str::contains("sync")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn check_prints_signal_and_writes_step_outputs() {
    let server = upstream().await;
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), &server);
    fs::write(dir.path().join("emoji_map.json"), "{\n  \"smile\": \"🙂\"\n}\n").unwrap();
    let outputs = dir.path().join("github_output");

    let outputs_for_cmd = outputs.clone();
    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("emoji-map-sync")
            .expect("Binary exists")
            .args(["check", "--config"])
            .arg(&config)
            .env("GITHUB_OUTPUT", &outputs_for_cmd)
            .env("RUST_LOG", "warn")
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::starts_with("changed=true\n"))
        .stdout(predicate::str::contains("1 added"));
    let written = fs::read_to_string(&outputs).unwrap();
    assert!(written.contains("changed=true\n"));
    assert!(written.contains("sha256="));
    // check never touches the artifact
    assert_eq!(
        fs::read_to_string(dir.path().join("emoji_map.json")).unwrap(),
        "{\n  \"smile\": \"🙂\"\n}\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn update_then_check_reports_no_change() {
    let server = upstream().await;
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), &server);

    let run = |subcommand: &'static str, config: std::path::PathBuf| {
        tokio::task::spawn_blocking(move || {
            Command::cargo_bin("emoji-map-sync")
                .expect("Binary exists")
                .arg(subcommand)
                .arg("--config")
                .arg(&config)
                .env_remove("GITHUB_OUTPUT")
                .assert()
        })
    };

    run("update", config.clone())
        .await
        .unwrap()
        .success()
        .stdout(predicate::str::starts_with("changed=true"));
    assert_eq!(
        fs::read_to_string(dir.path().join("emoji_map.json")).unwrap(),
        "{\n  \"smile\": \"🙂\",\n  \"wink\": \"😉\"\n}\n"
    );

    run("check", config)
        .await
        .unwrap()
        .success()
        .stdout(predicate::str::starts_with("changed=false"));
}

#[test]
fn sync_without_credentials_fails_before_fetching() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("emoji-sync.yaml");
    fs::write(
        &config,
        "source:\n  type: json\n  url: http://127.0.0.1:9/emoji.json\nartifact:\n  path: emoji_map.json\npublish:\n  github_repository: o/r\n",
    )
    .unwrap();

    Command::cargo_bin("emoji-map-sync")
        .expect("Binary exists")
        .args(["sync", "--config"])
        .arg(&config)
        .env_remove("EMOJI_SYNC_GITHUB_TOKEN")
        .env_remove("GITHUB_TOKEN")
        .env_remove("EMOJI_SYNC_SIGNING_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("EMOJI_SYNC_SIGNING_KEY"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use emoji_map_sync::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Check {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    assert!(run(cli).await.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

//! End-to-end collection tests against scripted fake workers.
//!
//! Each test spawns `sh` as the worker process so the real spawn, exchange
//! and terminate paths are exercised without a Python installation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;

use magpie::config::SelectionSettings;
use magpie::worker::protocol::CollectRequest;
use magpie::{CollectionError, Collector, WorkerClient, WorkerCollector};

/// The scenario response: a class with one method, flattened.
const SCENARIO_RESPONSE: &str = concat!(
    r#"{"objects":[{"path":"pkg.Foo","category":"class","#,
    r#""children":{"pkg.Foo.bar":{"path":"pkg.Foo.bar","category":"method","#,
    r#""children":{},"attributes":[],"classes":[],"functions":[],"methods":[],"modules":[]}},"#,
    r#""attributes":[],"classes":[],"functions":[],"methods":["pkg.Foo.bar"],"modules":[]}],"#,
    r#""loading_errors":[],"parsing_errors":{}}"#
);

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

async fn script_worker(script: &str) -> WorkerClient {
    init_tracing();
    WorkerClient::spawn("sh", &["-c".to_string(), script.to_string()])
        .await
        .expect("sh must be spawnable")
}

fn respond_with(body: &str) -> String {
    format!("resp='{body}'; while read -r line; do printf '%s\\n' \"$resp\"; done")
}

fn request() -> CollectRequest {
    CollectRequest::new("pkg.Foo", Map::new())
}

#[tokio::test]
async fn collect_rebuilds_the_scenario_tree() {
    let client = script_worker(&respond_with(SCENARIO_RESPONSE)).await;
    let collector = WorkerCollector::new(client, &SelectionSettings::default());

    let node = collector.collect("pkg.Foo", Map::new()).await.unwrap();
    assert_eq!(node.path, "pkg.Foo");
    assert_eq!(node.children.len(), 1);

    let methods: Vec<_> = node.methods().collect();
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].path, "pkg.Foo.bar");
    // The category entry and the child are the same node, not copies.
    assert!(std::ptr::eq(methods[0], &node.children[0]));

    collector.teardown();
}

#[tokio::test]
async fn collect_twice_reuses_the_same_worker() {
    let client = script_worker(&respond_with(SCENARIO_RESPONSE)).await;
    let collector = WorkerCollector::new(client, &SelectionSettings::default());

    let first = collector.collect("pkg.Foo", Map::new()).await.unwrap();
    let second = collector.collect("pkg.Foo", Map::new()).await.unwrap();
    assert_eq!(first.path, second.path);

    collector.teardown();
}

#[tokio::test]
async fn worker_error_surfaces_with_its_message() {
    let client = script_worker(&respond_with(
        r#"{"error":"boom","traceback":"Traceback ..."}"#,
    ))
    .await;
    let collector = WorkerCollector::new(client, &SelectionSettings::default());

    let err = collector.collect("pkg.Foo", Map::new()).await.unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert!(matches!(err, CollectionError::Worker { .. }));

    // A full line was exchanged; the channel stays usable.
    let err = collector.collect("pkg.Foo", Map::new()).await.unwrap_err();
    assert!(matches!(err, CollectionError::Worker { .. }));

    collector.teardown();
}

#[tokio::test]
async fn loading_errors_do_not_abort_the_call() {
    let body = concat!(
        r#"{"objects":[{"path":"pkg","category":"module","children":{},"#,
        r#""attributes":[],"classes":[],"functions":[],"methods":[],"modules":[]}],"#,
        r#""loading_errors":["x"],"parsing_errors":{}}"#
    );
    let client = script_worker(&respond_with(body)).await;
    let collector = WorkerCollector::new(client, &SelectionSettings::default());

    let node = collector.collect("pkg", Map::new()).await.unwrap();
    assert_eq!(node.path, "pkg");

    collector.teardown();
}

#[tokio::test]
async fn non_json_output_is_a_decode_error() {
    let client = script_worker("while read -r line; do echo 'pytkdocs exploded'; done").await;
    let collector = WorkerCollector::new(client, &SelectionSettings::default());

    let err = collector.collect("pkg.Foo", Map::new()).await.unwrap_err();
    match err {
        CollectionError::Decode { line, .. } => assert_eq!(line, "pytkdocs exploded"),
        other => panic!("expected Decode error, got {other:?}"),
    }

    collector.teardown();
}

#[tokio::test]
async fn worker_exit_poisons_the_channel() {
    // Reads one request, then exits without answering.
    let client = script_worker("read -r line").await;

    let err = client.exchange(&request()).await.unwrap_err();
    assert!(matches!(err, CollectionError::WorkerExited));
    assert!(err.requires_restart());

    let err = client.exchange(&request()).await.unwrap_err();
    assert!(matches!(err, CollectionError::ChannelPoisoned));
}

#[tokio::test]
async fn timeout_expiry_poisons_the_channel() {
    let client = WorkerClient::spawn_with_timeout(
        "sh",
        &["-c".to_string(), "read -r line; sleep 30".to_string()],
        Some(Duration::from_secs(1)),
    )
    .await
    .unwrap();

    let err = client.exchange(&request()).await.unwrap_err();
    assert!(matches!(err, CollectionError::Timeout(1)));

    // No resynchronization is attempted; the worker must be restarted.
    let err = client.exchange(&request()).await.unwrap_err();
    assert!(matches!(err, CollectionError::ChannelPoisoned));

    client.terminate();
}

#[tokio::test]
async fn concurrent_exchange_is_detected_as_misuse() {
    let script = format!(
        "resp='{SCENARIO_RESPONSE}'; while read -r line; do sleep 2; printf '%s\\n' \"$resp\"; done"
    );
    let client = Arc::new(script_worker(&script).await);

    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.exchange(&request()).await })
    };

    // Give the first exchange time to take the channel.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let err = client.exchange(&request()).await.unwrap_err();
    assert!(matches!(err, CollectionError::ChannelBusy));

    // The in-flight exchange is unaffected by the rejected one.
    let line = slow.await.unwrap().unwrap();
    assert!(line.contains("pkg.Foo"));

    client.terminate();
}

#[tokio::test]
async fn terminate_is_idempotent() {
    let client = script_worker("while read -r line; do :; done").await;
    assert!(client.is_alive());

    client.terminate();
    client.terminate();
    assert!(!client.is_alive());
}

#[tokio::test]
async fn spawn_failure_is_fatal() {
    let err = WorkerClient::spawn("/nonexistent/definitely-missing-worker", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CollectionError::Spawn(_)));
}

// Integration tests for the data-source adapters.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waterpanel_core::config::DEFAULT_REST_ENDPOINT;
use waterpanel_core::{
    ConnectionConfig, CoreError, DataSource, MqttSubscriber, RestPoller, SourceEvent, Transport,
};

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

fn rest_config(server: &MockServer) -> ConnectionConfig {
    let mut config =
        ConnectionConfig::default().with_choice(Transport::Rest, &server.address().to_string());
    config.poll_interval = Duration::from_millis(10);
    config
}

fn flow(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "Values": [{ "Name": "Flow_2", "Value": 1 }, { "Name": "Flow_1", "Value": value }]
    }))
}

async fn next(rx: &mut mpsc::UnboundedReceiver<SourceEvent>) -> SourceEvent {
    tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── REST poller ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_poller_forwards_readings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEFAULT_REST_ENDPOINT))
        .respond_with(flow(json!(42.5)))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();
    poller.start(&rest_config(&server), tx).unwrap();
    assert!(poller.is_running());

    for _ in 0..2 {
        match next(&mut rx).await {
            SourceEvent::Reading(reading) => assert_eq!(reading.formatted(), "42.50"),
            other => panic!("expected reading, got {other:?}"),
        }
    }

    poller.stop();
    assert!(!poller.is_running());
}

#[tokio::test]
async fn test_poller_gives_up_after_three_sentinels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEFAULT_REST_ENDPOINT))
        .respond_with(flow(json!(-105)))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();
    poller.start(&rest_config(&server), tx).unwrap();

    match next(&mut rx).await {
        SourceEvent::Exhausted { failures, error } => {
            assert_eq!(failures, 3);
            assert!(matches!(error, CoreError::NoDataSentinel { .. }));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }

    // The task ends on its own and drops the sender.
    assert!(tokio::time::timeout(WAIT, rx.recv()).await.unwrap().is_none());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_poller_success_resets_failure_streak() {
    let server = MockServer::start().await;
    // missing, sentinel, good, sentinel, sentinel, sentinel
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Values": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(flow(json!(-105)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(flow(json!(9)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(flow(json!(-105)))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();
    poller.start(&rest_config(&server), tx).unwrap();

    assert!(matches!(next(&mut rx).await, SourceEvent::Reading(r) if r.formatted() == "9.00"));
    assert!(matches!(
        next(&mut rx).await,
        SourceEvent::Exhausted { failures: 3, .. }
    ));
    assert_eq!(request_count(&server).await, 6);
}

#[tokio::test]
async fn test_poller_counts_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();
    poller.start(&rest_config(&server), tx).unwrap();

    match next(&mut rx).await {
        SourceEvent::Exhausted { failures, error } => {
            assert_eq!(failures, 3);
            assert!(error.is_transport());
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stopped_poller_emits_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(flow(json!(1.5)).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();
    poller.start(&rest_config(&server), tx).unwrap();

    // Stop while the first fetch is still in flight.
    tokio::time::sleep(Duration::from_millis(20)).await;
    poller.stop();
    poller.stop();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
    assert!(!poller.is_running());
}

#[tokio::test]
async fn test_restart_replaces_previous_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(flow(json!(2)))
        .mount(&server)
        .await;

    let config = rest_config(&server);
    let (old_tx, mut old_rx) = mpsc::unbounded_channel();
    let (new_tx, mut new_rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();

    poller.start(&config, old_tx).unwrap();
    assert!(matches!(next(&mut old_rx).await, SourceEvent::Reading(_)));
    poller.start(&config, new_tx).unwrap();

    assert!(matches!(next(&mut new_rx).await, SourceEvent::Reading(_)));
    // The old run's sender is gone once its task notices cancellation.
    while let Ok(Some(_)) = tokio::time::timeout(WAIT, old_rx.recv()).await {}
    poller.stop();
}

#[tokio::test]
async fn test_unreachable_rest_host_exhausts() {
    let mut config = ConnectionConfig::default()
        .with_choice(Transport::Rest, &format!("127.0.0.1:{}", closed_port()));
    config.poll_interval = Duration::from_millis(10);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = RestPoller::new();
    poller.start(&config, tx).unwrap();

    match next(&mut rx).await {
        SourceEvent::Exhausted { failures, error } => {
            assert_eq!(failures, 3);
            assert!(error.is_transport());
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

// ── MQTT subscriber ─────────────────────────────────────────────────

#[tokio::test]
async fn test_mqtt_refused_connections_exhaust() {
    let mut config = ConnectionConfig::default();
    config.mqtt_port = closed_port();
    config.mqtt_reconnect = Duration::from_millis(10);
    config.mqtt_connect_timeout = Duration::from_secs(2);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut subscriber = MqttSubscriber::new();
    subscriber.start(&config, tx).unwrap();
    assert!(subscriber.is_running());

    match tokio::time::timeout(Duration::from_secs(15), rx.recv())
        .await
        .unwrap()
        .unwrap()
    {
        SourceEvent::Exhausted { failures, error } => {
            assert_eq!(failures, 3);
            assert!(error.is_transport());
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }

    subscriber.stop();
    subscriber.stop();
    assert!(!subscriber.is_running());
}

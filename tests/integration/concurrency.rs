//! Several automatons running side by side

use std::time::Duration;

use assert_matches::assert_matches;
use automaton::{error::AutomatonError, runner::Runner};
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_automatons_poll_concurrently() {
    // each backend takes 500ms; run serially the three would need 1.5s
    let mut backends = vec![];
    for _ in 0..3 {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"aggregations": {QUERY_NAME: {"buckets": []}}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&backend)
            .await;
        backends.push(backend);
    }

    let config = config_of(
        backends
            .iter()
            .enumerate()
            .map(|(i, backend)| automaton_json(&format!("automaton_{i}"), &backend.uri(), vec![]))
            .collect(),
    );

    let runner = Runner::from_config(&config).unwrap();
    let started = tokio::time::Instant::now();
    tokio_test::assert_ok!(runner.run().await);

    assert!(started.elapsed() < Duration::from_millis(1200));
}

#[tokio::test]
async fn test_recurring_automaton_keeps_polling_while_sibling_fails() {
    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    mount_buckets(&healthy, json!([])).await;

    let mut recurring = automaton_json("healthy", &healthy.uri(), vec![]);
    recurring["runonce"] = json!(false);

    let config = config_of(vec![automaton_json("broken", &broken.uri(), vec![]), recurring]);
    let runner = Runner::from_config(&config).unwrap();

    // the healthy automaton never stops on its own
    let outcome = tokio::time::timeout(Duration::from_millis(400), runner.run()).await;
    assert!(outcome.is_err(), "runner should still be waiting on the healthy automaton");

    // 50ms interval over 400ms leaves room for several polls
    let polls = healthy.received_requests().await.unwrap().len();
    assert!(polls >= 3, "expected repeated polls, got {polls}");
}

#[tokio::test]
async fn test_disabled_automaton_is_not_polled() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let mut automaton = automaton_json("t_automaton", &backend.uri(), vec![]);
    automaton["enabled"] = json!(false);

    let runner = Runner::from_config(&config_of(vec![automaton])).unwrap();
    tokio_test::assert_ok!(runner.run().await);
}

#[tokio::test]
async fn test_runner_reports_failure_after_siblings_finish() {
    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;

    let slow = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"aggregations": {QUERY_NAME: {"buckets": []}}}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&slow)
        .await;

    let config = config_of(vec![
        automaton_json("broken", &broken.uri(), vec![]),
        automaton_json("slow", &slow.uri(), vec![]),
    ]);

    let result = Runner::from_config(&config).unwrap().run().await;
    assert_matches!(result, Err(AutomatonError::Request(_)));
    // `slow` was awaited: its expectation is verified when the mock server drops
}

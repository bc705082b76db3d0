//! Failure tests for the poll loop
//!
//! Every failure ends the automaton's loop with a typed error; none of
//! them panic and none are retried.

use std::time::Duration;

use assert_matches::assert_matches;
use automaton::error::AutomatonError;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_backend_unreachable() {
    // Nothing listens on port 9
    let config = config_of(vec![automaton_json("t_automaton", "http://127.0.0.1:9", vec![])]);

    let result = entity_from(&config).run().await;
    assert_matches!(result, Err(AutomatonError::Request(_)));
}

#[tokio::test]
async fn test_backend_500() {
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backend)
        .await;

    let config = config_of(vec![automaton_json("t_automaton", &backend.uri(), vec![])]);

    let result = entity_from(&config).run().await;
    assert_matches!(result, Err(AutomatonError::Request(msg)) if msg.contains("500"));
}

#[tokio::test]
async fn test_backend_timeout() {
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&backend)
        .await;

    // elasticsearch_timeout is 1s in the helper
    let config = config_of(vec![automaton_json("t_automaton", &backend.uri(), vec![])]);

    let result = entity_from(&config).run().await;
    assert!(result.is_err_and(|e| e.is_timeout()));
}

#[tokio::test]
async fn test_response_without_query_group() {
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"aggregations": {"other_query": {"buckets": []}}})),
        )
        .mount(&backend)
        .await;

    let config = config_of(vec![automaton_json("t_automaton", &backend.uri(), vec![])]);

    let result = entity_from(&config).cycle().await;
    assert_matches!(result, Err(AutomatonError::Lookup(msg)) if msg.contains(QUERY_NAME));
}

#[tokio::test]
async fn test_rejected_notification_stops_the_loop() {
    let backend = MockServer::start().await;
    let rocketchat = MockServer::start().await;

    mount_buckets(&backend, json!([{"key": "test", "doc_count": 1}])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&rocketchat)
        .await;

    let config = config_of(vec![automaton_json(
        "t_automaton",
        &backend.uri(),
        vec![notify_json(&rocketchat.uri(), 60)],
    )]);
    let mut entity = entity_from(&config);

    let result = entity.run().await;
    assert_matches!(result, Err(AutomatonError::Request(_)));
    assert!(!entity.processor().slots()[0].state.has_run());
}

#[tokio::test]
async fn test_awx_200_is_not_accepted() {
    let backend = MockServer::start().await;
    let awx = MockServer::start().await;

    mount_buckets(&backend, json!([{"key": "test", "doc_count": 1}])).await;

    // job launches answer 201; anything else is a failure
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&awx)
        .await;

    let config = config_of(vec![automaton_json(
        "t_automaton",
        &backend.uri(),
        vec![awx_json(&awx.uri(), 60)],
    )]);

    let result = entity_from(&config).cycle().await;
    assert_matches!(result, Err(AutomatonError::Request(_)));
}

#[tokio::test]
async fn test_slow_webhook_times_out() {
    let backend = MockServer::start().await;
    let rocketchat = MockServer::start().await;

    mount_buckets(&backend, json!([{"key": "test", "doc_count": 1}])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&rocketchat)
        .await;

    let config = config_of(vec![automaton_json(
        "t_automaton",
        &backend.uri(),
        vec![notify_json(&rocketchat.uri(), 60)],
    )]);

    let result = entity_from(&config).cycle().await;
    assert_matches!(result, Err(AutomatonError::Timeout(_)));
}

#[test]
fn test_zero_backend_timeout_is_rejected() {
    let mut automaton = automaton_json("t_automaton", "http://localhost:9200", vec![]);
    automaton["elasticsearch_timeout"] = json!(0);

    let result = config_of(vec![automaton]).resolve();
    assert_matches!(result, Err(AutomatonError::InvalidConfig(msg)) if msg.contains("t_automaton"));
}

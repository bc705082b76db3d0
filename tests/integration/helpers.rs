//! Helper functions for integration tests

use std::sync::{Arc, Mutex};

use automaton::{
    actions::HttpDispatcher,
    config::{Config, parse_config},
    entity::Entity,
    processor::Clock,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const QUERY_NAME: &str = "t_automaton_query";

/// A single automaton record in the configuration wire format.
pub fn automaton_json(name: &str, backend_url: &str, actions: Vec<Value>) -> Value {
    json!({
        "name": name,
        "runonce": true,
        "elasticsearch_url": backend_url,
        "elasticsearch_timeout": 1,
        "elasticsearch_query": {
            "query_interval": 0.05,
            "query_endpoint": "/_search",
            "query_type": "aggregations",
            "query_name": QUERY_NAME,
            "query_payload": {"size": 0},
            "query_response_mapping": {"key": "x", "doc_count": "hits"}
        },
        "actions": actions
    })
}

pub fn notify_json(webhook: &str, backoff_seconds: u64) -> Value {
    json!({
        "name": "notify.rocketchat_webhook",
        "backoff_seconds": backoff_seconds,
        "parameters": {
            "rocketchat_webhook": webhook,
            "rocketchat_message": "mock alert",
            "rocketchat_timeout": 1
        }
    })
}

pub fn awx_json(url: &str, backoff_seconds: u64) -> Value {
    json!({
        "name": "awx.api_call",
        "backoff_seconds": backoff_seconds,
        "parameters": {
            "awx_url": url,
            "awx_context": "/api/v2/job_templates/7/launch/",
            "awx_timeout": 1,
            "awx_auth": {"username": "YWRtaW4=", "password": "c2VjcmV0"}
        }
    })
}

pub fn config_of(automatons: Vec<Value>) -> Config {
    parse_config(&json!({ "automatons": automatons }).to_string()).unwrap()
}

/// Build the first automaton of `config` with a real HTTP dispatcher.
pub fn entity_from(config: &Config) -> Entity {
    let resolved = config.resolve().unwrap().remove(0);
    Entity::new(resolved, Arc::new(HttpDispatcher::new().unwrap())).unwrap()
}

/// Mount a backend answering every query with the given buckets.
pub async fn mount_buckets(server: &MockServer, buckets: Value) {
    Mock::given(method("POST"))
        .and(path("/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aggregations": { QUERY_NAME: { "buckets": buckets } }
        })))
        .mount(server)
        .await;
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += TimeDelta::seconds(secs);
    }

    pub fn clock(&self) -> Clock {
        let inner = self.0.clone();
        Arc::new(move || *inner.lock().unwrap())
    }
}

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::actions::Action;
use crate::error::{AutomatonError, AutomatonResult};
use crate::util::get_inline_config;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub automatons: Vec<EntityConfig>,
}

/// One monitored condition, as written in the configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(rename = "runonce", default)]
    pub run_once: bool,

    #[serde(rename = "elasticsearch_url")]
    pub backend_url: String,

    /// Seconds
    #[serde(rename = "elasticsearch_timeout", default = "default_backend_timeout")]
    pub backend_timeout: f64,

    #[serde(rename = "elasticsearch_query")]
    pub query: QuerySpec,

    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySpec {
    /// Seconds between two polls
    #[serde(rename = "query_interval", default = "default_poll_interval")]
    pub poll_interval: f64,

    #[serde(rename = "query_endpoint")]
    pub endpoint_path: String,

    #[serde(rename = "query_type", default = "default_container_key")]
    pub result_container_key: String,

    #[serde(rename = "query_name")]
    pub result_group_key: String,

    #[serde(rename = "query_payload", default = "default_payload")]
    pub request_payload: Value,

    #[serde(rename = "query_response_mapping", default)]
    pub field_rename_map: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    #[serde(rename = "name")]
    pub kind: String,

    pub backoff_seconds: u64,

    #[serde(default = "default_payload")]
    pub parameters: Value,
}

fn default_enabled() -> bool {
    true
}

fn default_backend_timeout() -> f64 {
    10.0
}

fn default_poll_interval() -> f64 {
    60.0
}

fn default_container_key() -> String {
    String::from("aggregations")
}

fn default_payload() -> Value {
    Value::Object(Default::default())
}

/// Entity configuration with validated durations and typed actions
#[derive(Debug, Clone)]
pub struct ResolvedEntityConfig {
    pub name: String,
    pub enabled: bool,
    pub run_once: bool,
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub query: ResolvedQuery,
    pub actions: Vec<ResolvedAction>,
}

#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub poll_interval: Duration,
    pub endpoint_path: String,
    pub result_container_key: String,
    pub result_group_key: String,
    pub request_payload: Value,
    pub field_rename_map: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedAction {
    /// Kind as written in the configuration
    pub kind: String,
    pub backoff: TimeDelta,
    /// `None` when the kind is not a known action
    pub action: Option<Action>,
}

impl Config {
    pub fn resolve(&self) -> AutomatonResult<Vec<ResolvedEntityConfig>> {
        self.automatons.iter().map(EntityConfig::resolve).collect()
    }
}

impl EntityConfig {
    pub fn resolve(&self) -> AutomatonResult<ResolvedEntityConfig> {
        let in_entity =
            |e: AutomatonError| AutomatonError::InvalidConfig(format!("automaton '{}': {e}", self.name));

        let backend_timeout =
            timeout_from_secs("elasticsearch_timeout", self.backend_timeout).map_err(in_entity)?;
        let query = self.query.resolve().map_err(in_entity)?;
        let actions = self
            .actions
            .iter()
            .map(|action| action.resolve(&self.name))
            .collect::<AutomatonResult<Vec<_>>>()
            .map_err(in_entity)?;

        Ok(ResolvedEntityConfig {
            name: self.name.clone(),
            enabled: self.enabled,
            run_once: self.run_once,
            backend_url: self.backend_url.clone(),
            backend_timeout,
            query,
            actions,
        })
    }
}

impl QuerySpec {
    pub fn resolve(&self) -> AutomatonResult<ResolvedQuery> {
        Ok(ResolvedQuery {
            poll_interval: interval_from_secs("query_interval", self.poll_interval)?,
            endpoint_path: self.endpoint_path.clone(),
            result_container_key: self.result_container_key.clone(),
            result_group_key: self.result_group_key.clone(),
            request_payload: self.request_payload.clone(),
            field_rename_map: self.field_rename_map.clone(),
        })
    }
}

impl ActionConfig {
    pub fn resolve(&self, entity: &str) -> AutomatonResult<ResolvedAction> {
        let action = Action::resolve(&self.kind, &self.parameters)?;
        if action.is_none() {
            warn!("automaton: {entity} has unknown action {}, it will be skipped", self.kind);
        }

        let backoff = i64::try_from(self.backoff_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                AutomatonError::InvalidConfig(format!(
                    "backoff_seconds {} is out of range",
                    self.backoff_seconds
                ))
            })?;

        Ok(ResolvedAction {
            kind: self.kind.clone(),
            backoff,
            action,
        })
    }
}

/// A bound for an outbound call; must be positive.
pub fn timeout_from_secs(field: &str, secs: f64) -> AutomatonResult<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(AutomatonError::InvalidConfig(format!(
            "{field} must be a positive number of seconds, got {secs}"
        ))),
    }
}

/// A sleep between polls; zero is allowed.
pub fn interval_from_secs(field: &str, secs: f64) -> AutomatonResult<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        AutomatonError::InvalidConfig(format!(
            "{field} must be a non-negative number of seconds, got {secs}"
        ))
    })
}

pub fn parse_config(content: &str) -> AutomatonResult<Config> {
    serde_json::from_str(content)
        .map_err(AutomatonError::from)
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Read a JSON configuration file, or TOML when the file ends in `.toml`.
pub fn read_config_file(path: impl AsRef<Path>) -> AutomatonResult<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&file_content)
            .map_err(AutomatonError::from)
            .inspect(|config| trace!("loaded config: {config:?}"))
    } else {
        parse_config(&file_content)
    }
}

/// Read the JSON configuration held in `AUTOMATON_CONFIG`.
pub fn read_config_env() -> AutomatonResult<Config> {
    let content = get_inline_config().ok_or_else(|| {
        AutomatonError::InvalidConfig(
            "no configuration file given and AUTOMATON_CONFIG is not set".to_string(),
        )
    })?;
    parse_config(&content)
}

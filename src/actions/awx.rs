use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::EventRecord;
use crate::config::timeout_from_secs;
use crate::error::{AutomatonError, AutomatonResult};

/// Body of a job template launch
#[derive(Debug, Clone, Serialize)]
pub struct LaunchRequest<'a> {
    pub extra_vars: &'a EventRecord,
}

#[derive(Debug, Clone, Deserialize)]
struct AwxParameters {
    awx_url: String,
    awx_context: String,
    #[serde(default = "default_timeout")]
    awx_timeout: f64,
    awx_auth: AwxAuth,
    #[serde(default)]
    awx_verify_ssl: bool,
}

/// Both fields are base64 encoded in the configuration
#[derive(Debug, Clone, Deserialize)]
struct AwxAuth {
    username: String,
    password: String,
}

fn default_timeout() -> f64 {
    10.0
}

/// Launches an AWX job template once per detected record, passing the
/// record as `extra_vars`.
#[derive(Clone, PartialEq)]
pub struct AwxAction {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub verify_ssl: bool,
}

impl fmt::Debug for AwxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwxAction")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

fn decode_credential(field: &str, encoded: &str) -> AutomatonResult<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| AutomatonError::InvalidConfig(format!("awx_auth.{field}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| AutomatonError::InvalidConfig(format!("awx_auth.{field} is not UTF-8")))
}

impl AwxAction {
    pub fn from_parameters(parameters: &Value) -> AutomatonResult<Self> {
        let AwxParameters {
            awx_url,
            awx_context,
            awx_timeout,
            awx_auth,
            awx_verify_ssl,
        } = AwxParameters::deserialize(parameters)
            .map_err(|e| AutomatonError::InvalidConfig(format!("awx parameters: {e}")))?;

        Ok(Self {
            url: format!("{awx_url}{awx_context}"),
            username: decode_credential("username", &awx_auth.username)?,
            password: decode_credential("password", &awx_auth.password)?,
            timeout: timeout_from_secs("awx_timeout", awx_timeout)?,
            verify_ssl: awx_verify_ssl,
        })
    }

    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn launch(&self, client: &Client, records: &[EventRecord]) -> AutomatonResult<()> {
        for record in records {
            debug!("calling awx api with action metadata: {record}");

            let response = client
                .post(&self.url)
                .timeout(self.timeout)
                .basic_auth(&self.username, Some(&self.password))
                .json(&LaunchRequest { extra_vars: record })
                .send()
                .await
                .map_err(AutomatonError::from)
                .inspect_err(|e| error!("failed to call awx api: {e}"))?;

            // job launches answer with 201 Created
            let status = response.status();
            if status != StatusCode::CREATED {
                error!("awx api call failed with status: {status}");
                if let Ok(error_text) = response.text().await {
                    error!("awx error response: {error_text}");
                }
                return Err(AutomatonError::Request(format!(
                    "awx api returned {status}"
                )));
            }

            info!("awx api call has been executed");
        }

        Ok(())
    }
}

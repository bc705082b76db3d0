use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::EventRecord;
use crate::config::timeout_from_secs;
use crate::error::{AutomatonError, AutomatonResult};

/// Body of an incoming-webhook call
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub text: String,
}

impl Notification {
    pub fn new(message: &str, record: &EventRecord) -> Self {
        Self {
            text: format!("{message}\naction metadata: {record}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RocketChatParameters {
    rocketchat_webhook: String,
    rocketchat_message: String,
    #[serde(default = "default_timeout")]
    rocketchat_timeout: f64,
}

fn default_timeout() -> f64 {
    10.0
}

/// Posts one message per detected record to a RocketChat incoming webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct RocketChatAction {
    pub webhook: String,
    pub message: String,
    pub timeout: Duration,
}

impl RocketChatAction {
    pub fn from_parameters(parameters: &Value) -> AutomatonResult<Self> {
        let RocketChatParameters {
            rocketchat_webhook,
            rocketchat_message,
            rocketchat_timeout,
        } = RocketChatParameters::deserialize(parameters).map_err(|e| {
            AutomatonError::InvalidConfig(format!("rocketchat parameters: {e}"))
        })?;

        Ok(Self {
            webhook: rocketchat_webhook,
            message: rocketchat_message,
            timeout: timeout_from_secs("rocketchat_timeout", rocketchat_timeout)?,
        })
    }

    #[instrument(skip_all, fields(webhook = %self.webhook))]
    pub async fn send(&self, client: &Client, records: &[EventRecord]) -> AutomatonResult<()> {
        for record in records {
            debug!("sending rocketchat notification with action metadata: {record}");

            let notification = Notification::new(&self.message, record);
            let response = client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&notification)
                .send()
                .await
                .map_err(AutomatonError::from)
                .inspect_err(|e| error!("failed to send rocketchat notification: {e}"))?;

            let status = response.status();
            if status != StatusCode::OK {
                error!("rocketchat notification failed with status: {status}");
                if let Ok(error_text) = response.text().await {
                    error!("rocketchat error response: {error_text}");
                }
                return Err(AutomatonError::Request(format!(
                    "rocketchat webhook returned {status}"
                )));
            }

            info!("rocketchat notification has been sent");
        }

        Ok(())
    }
}

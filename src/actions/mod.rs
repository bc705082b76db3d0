//! Outbound side-effects fired when an automaton detects activity
//!
//! Every action kind is a variant of [`Action`]. Configuration names select
//! the variant; names that match no variant resolve to `None` and are
//! skipped by the processor.
//!
//! | configuration name                      | variant              | expects |
//! |-----------------------------------------|----------------------|---------|
//! | `notify.rocketchat_webhook` / `notify`  | [`Action::RocketChat`] | 200   |
//! | `awx.api_call` / `awx`                  | [`Action::Awx`]        | 201   |

pub mod awx;
pub mod rocketchat;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::EventRecord;
use crate::error::AutomatonResult;

pub use awx::AwxAction;
pub use rocketchat::RocketChatAction;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RocketChat(RocketChatAction),
    Awx(AwxAction),
}

impl Action {
    /// Build the action for a configured kind.
    ///
    /// Returns `Ok(None)` for unknown kinds and an error when a known kind has
    /// unusable parameters.
    pub fn resolve(kind: &str, parameters: &Value) -> AutomatonResult<Option<Action>> {
        let action = match kind {
            "notify.rocketchat_webhook" | "notify" => {
                Action::RocketChat(RocketChatAction::from_parameters(parameters)?)
            }
            "awx.api_call" | "awx" => Action::Awx(AwxAction::from_parameters(parameters)?),
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::RocketChat(_) => "notify.rocketchat_webhook",
            Action::Awx(_) => "awx.api_call",
        }
    }
}

/// Performs an action for every record of one detection.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, action: &Action, records: &[EventRecord]) -> AutomatonResult<()>;
}

/// Dispatches actions over HTTP.
///
/// AWX calls go through the client that accepts invalid certificates unless
/// the action sets `awx_verify_ssl`.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    insecure_client: Client,
}

impl HttpDispatcher {
    pub fn new() -> AutomatonResult<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            insecure_client: Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?,
        })
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, action: &Action, records: &[EventRecord]) -> AutomatonResult<()> {
        match action {
            Action::RocketChat(rocketchat) => rocketchat.send(&self.client, records).await,
            Action::Awx(awx) => {
                let client = if awx.verify_ssl {
                    &self.client
                } else {
                    &self.insecure_client
                };
                awx.launch(client, records).await
            }
        }
    }
}

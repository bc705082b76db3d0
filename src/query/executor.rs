use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{error, instrument, trace};

use crate::config::ResolvedQuery;
use crate::error::{AutomatonError, AutomatonResult};

/// Runs one configured query against the backend.
///
/// The client is built once with the backend timeout and reused for every
/// poll of the owning automaton.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    client: Client,
    url: String,
    payload: Value,
}

impl QueryExecutor {
    pub fn new(backend_url: &str, query: &ResolvedQuery, timeout: Duration) -> AutomatonResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: format!("{backend_url}{}", query.endpoint_path),
            payload: query.request_payload.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the payload and return the parsed body of a 200 response.
    ///
    /// Timeouts surface as [`AutomatonError::Timeout`]; refused connections,
    /// other status codes and undecodable bodies as
    /// [`AutomatonError::Request`].
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn execute(&self) -> AutomatonResult<Value> {
        trace!("sending query");

        let response = self
            .client
            .post(&self.url)
            .json(&self.payload)
            .send()
            .await
            .map_err(AutomatonError::from)
            .inspect_err(|e| error!("query failed: {e}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("query failed with status: {status}");
            return Err(AutomatonError::Request(format!(
                "backend returned {status} for {}",
                self.url
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(AutomatonError::from)
            .inspect_err(|e| error!("failed to decode query response: {e}"))?;

        trace!("received query response");
        Ok(body)
    }
}

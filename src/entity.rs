//! Automaton - one monitored condition and its poll loop
//!
//! ## Loop
//!
//! ```text
//! ┌──► execute query ──► map buckets ──► any records? ──yes──► process actions ─┐
//! │                                           │ no                              │
//! │                                           ▼                                 │
//! └──────── sleep(poll_interval) ◄──── run_once? ──no─────────────◄─────────────┘
//!                                             │ yes
//!                                             ▼
//!                                          Stopped
//! ```
//!
//! Any error ends the loop and is returned to the caller. There is no
//! restart; the runner reports the failure.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Span, debug, error, info, info_span, trace};

use crate::actions::Dispatch;
use crate::config::{ResolvedEntityConfig, ResolvedQuery};
use crate::error::AutomatonResult;
use crate::processor::{ActionProcessor, Clock};
use crate::query::{QueryExecutor, map_response};

pub struct Entity {
    name: String,
    enabled: bool,
    run_once: bool,
    query: ResolvedQuery,
    executor: QueryExecutor,
    processor: ActionProcessor,

    /// Every log line of this automaton is emitted inside this span
    span: Span,
}

impl Entity {
    pub fn new(config: ResolvedEntityConfig, dispatcher: Arc<dyn Dispatch>) -> AutomatonResult<Self> {
        let ResolvedEntityConfig {
            name,
            enabled,
            run_once,
            backend_url,
            backend_timeout,
            query,
            actions,
        } = config;

        let executor = QueryExecutor::new(&backend_url, &query, backend_timeout)?;
        let processor = ActionProcessor::new(name.clone(), actions, dispatcher);
        let span = info_span!("automaton", name = %name);

        Ok(Self {
            name,
            enabled,
            run_once,
            query,
            executor,
            processor,
            span,
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.processor = self.processor.with_clock(clock);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn processor(&self) -> &ActionProcessor {
        &self.processor
    }

    pub fn poll_interval(&self) -> Duration {
        self.query.poll_interval
    }

    /// One pass: query, map, and process actions if anything was found.
    ///
    /// Returns the number of records detected.
    pub async fn cycle(&mut self) -> AutomatonResult<usize> {
        let span = self.span.clone();
        self.cycle_inner().instrument(span).await
    }

    async fn cycle_inner(&mut self) -> AutomatonResult<usize> {
        let response = self.executor.execute().await?;
        let records = map_response(&response, &self.query)?;

        if records.is_empty() {
            debug!("automaton: {} has detected no activity", self.name);
            return Ok(0);
        }

        info!(
            "automaton: {} activity detected with {} record(s)",
            self.name,
            records.len()
        );
        trace!("automaton: {} records: {records:?}", self.name);

        self.processor.process(&records).await?;

        Ok(records.len())
    }

    /// Poll until stopped. Returns the number of completed cycles.
    ///
    /// A disabled automaton returns immediately; a run-once automaton returns
    /// after its first cycle.
    pub async fn run(&mut self) -> AutomatonResult<usize> {
        let span = self.span.clone();
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> AutomatonResult<usize> {
        if !self.enabled {
            info!("automaton: {} is disabled", self.name);
            return Ok(0);
        }

        debug!(
            "starting automaton {} against {} with interval {:?}",
            self.name,
            self.executor.url(),
            self.query.poll_interval
        );

        let mut cycles = 0;
        loop {
            if let Err(e) = self.cycle_inner().await {
                error!("automaton: {} stopped after error: {e}", self.name);
                return Err(e);
            }
            cycles += 1;

            if self.run_once {
                debug!("automaton: {} ran once, stopping", self.name);
                return Ok(cycles);
            }

            tokio::time::sleep(self.query.poll_interval).await;
        }
    }
}

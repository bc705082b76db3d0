//! Backoff-gated action dispatch
//!
//! Every configured action carries an [`ActionState`]. On each detection the
//! processor walks the actions in configuration order and evaluates them:
//!
//! ```text
//! last_run == None                          → FirstRun  (invoke, mark executed)
//! executed == false                         → Ready     (invoke, mark executed)
//! executed, now - last_run <  backoff       → Cooling   (nothing)
//! executed, now - last_run >= backoff       → Released  (clear executed, no invoke)
//! ```
//!
//! A released action fires on the *next* detection, never on the pass that
//! released it. After firing, the release check runs again against the fire
//! time, so a zero backoff leaves the action ready for the next pass.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, instrument, trace};

use crate::EventRecord;
use crate::actions::{Action, Dispatch};
use crate::config::ResolvedAction;
use crate::error::AutomatonResult;

/// Source of "now" for backoff decisions
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Runtime state of one action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionState {
    /// When the action last fired; `None` if it never did
    pub last_run: Option<DateTime<Utc>>,

    /// Set when the action fires, cleared once the backoff has elapsed
    pub executed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffEvaluation {
    FirstRun,
    Ready,
    Cooling,
    Released,
}

impl BackoffEvaluation {
    pub fn evaluate(state: &ActionState, now: DateTime<Utc>, backoff: TimeDelta) -> Self {
        let Some(last_run) = state.last_run else {
            return BackoffEvaluation::FirstRun;
        };

        if !state.executed {
            return BackoffEvaluation::Ready;
        }

        if now - last_run >= backoff {
            BackoffEvaluation::Released
        } else {
            BackoffEvaluation::Cooling
        }
    }

    pub fn fires(self) -> bool {
        matches!(self, BackoffEvaluation::FirstRun | BackoffEvaluation::Ready)
    }
}

impl ActionState {
    pub fn never_run() -> Self {
        Self::default()
    }

    pub fn has_run(&self) -> bool {
        self.last_run.is_some()
    }

    fn record_run(&mut self, at: DateTime<Utc>) {
        self.last_run = Some(at);
        self.executed = true;
    }

    fn release_if_elapsed(&mut self, now: DateTime<Utc>, backoff: TimeDelta) -> bool {
        let released =
            BackoffEvaluation::evaluate(self, now, backoff) == BackoffEvaluation::Released;
        if released {
            self.executed = false;
        }
        released
    }
}

/// One configured action together with its runtime state
#[derive(Debug, Clone)]
pub struct ActionSlot {
    pub kind: String,
    pub backoff: TimeDelta,
    pub action: Option<Action>,
    pub state: ActionState,
}

impl From<ResolvedAction> for ActionSlot {
    fn from(resolved: ResolvedAction) -> Self {
        Self {
            kind: resolved.kind,
            backoff: resolved.backoff,
            action: resolved.action,
            state: ActionState::never_run(),
        }
    }
}

/// Owns the action list of one automaton and fires actions on detections.
pub struct ActionProcessor {
    automaton: String,
    slots: Vec<ActionSlot>,
    dispatcher: Arc<dyn Dispatch>,
    clock: Clock,
}

impl ActionProcessor {
    pub fn new(
        automaton: impl Into<String>,
        actions: Vec<ResolvedAction>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            automaton: automaton.into(),
            slots: actions.into_iter().map(ActionSlot::from).collect(),
            dispatcher,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn slots(&self) -> &[ActionSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [ActionSlot] {
        &mut self.slots
    }

    /// Run one pass over all actions for the records of a detection.
    ///
    /// Stops at the first failing action; its state is left untouched and
    /// actions after it are not evaluated on this pass.
    #[instrument(skip_all, fields(automaton = %self.automaton, records = records.len()))]
    pub async fn process(&mut self, records: &[EventRecord]) -> AutomatonResult<()> {
        for slot in self.slots.iter_mut() {
            let Some(action) = &slot.action else {
                trace!("skipping unknown action {}", slot.kind);
                continue;
            };

            let evaluation = BackoffEvaluation::evaluate(&slot.state, (self.clock)(), slot.backoff);

            if evaluation.fires() {
                if evaluation == BackoffEvaluation::FirstRun {
                    info!(
                        "automaton: {} first time execution of action: {}",
                        self.automaton, slot.kind
                    );
                } else {
                    info!("automaton: {} executing action: {}", self.automaton, slot.kind);
                }

                self.dispatcher
                    .dispatch(action, records)
                    .await
                    .inspect_err(|e| {
                        error!(
                            "automaton: {} action {} failed: {e}",
                            self.automaton, slot.kind
                        )
                    })?;

                slot.state.record_run((self.clock)());
                info!(
                    "automaton: {} execution of action: {} completed",
                    self.automaton, slot.kind
                );
            }

            let now = (self.clock)();
            let last_run = slot.state.last_run;
            if slot.state.release_if_elapsed(now, slot.backoff) {
                debug!(
                    "automaton: {} action {} exceeded backoff period {}s (previous execution time {:?})",
                    self.automaton,
                    slot.kind,
                    slot.backoff.num_seconds(),
                    last_run
                );
            } else if slot.state.executed {
                debug!(
                    "automaton: {} action {} within backoff period {}s (previous execution time {:?})",
                    self.automaton,
                    slot.kind,
                    slot.backoff.num_seconds(),
                    last_run
                );
            }
        }

        Ok(())
    }
}

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::actions::{Dispatch, HttpDispatcher};
use crate::config::Config;
use crate::entity::Entity;
use crate::error::{AutomatonError, AutomatonResult};

/// Runs every configured automaton as its own task.
pub struct Runner {
    entities: Vec<Entity>,
}

impl Runner {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// Resolve the configuration and build one automaton per record, all
    /// sharing a single HTTP dispatcher.
    pub fn from_config(config: &Config) -> AutomatonResult<Self> {
        let dispatcher: Arc<dyn Dispatch> = Arc::new(HttpDispatcher::new()?);

        let entities = config
            .resolve()?
            .into_iter()
            .map(|resolved| Entity::new(resolved, dispatcher.clone()))
            .collect::<AutomatonResult<Vec<_>>>()?;

        Ok(Self::new(entities))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Spawn all automatons and wait for every one of them to finish.
    ///
    /// Failures are logged in completion order. The first failure is
    /// returned once all tasks are done.
    pub async fn run(self) -> AutomatonResult<()> {
        if self.entities.is_empty() {
            info!("no automatons configured");
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        for mut entity in self.entities {
            tasks.spawn(async move {
                let result = entity.run().await;
                (entity.name().to_string(), result)
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((name, Ok(cycles))) => {
                    debug!("automaton {name} finished after {cycles} cycle(s)");
                    continue;
                }
                Ok((name, Err(e))) => {
                    error!("automaton {name} failed: {e}");
                    e
                }
                Err(e) => {
                    let e = AutomatonError::from(e);
                    error!("{e}");
                    e
                }
            };

            first_error.get_or_insert(failure);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

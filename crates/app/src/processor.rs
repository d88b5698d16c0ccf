//! The change processor — both consumers of the change feed under one roof.
//!
//! Every event fans out to two independent consumers: the rollup propagator
//! and the rule engine. They run concurrently per event and are isolated
//! from each other, so a broken rollup walk never starves automations and
//! vice versa.

use tokio::sync::{broadcast, watch};

use planhub_domain::event::ChangeEvent;

use crate::ports::{AutomationRepository, ExecutionLog, Notifier, TreeStore};
use crate::rollup::{LevelRollup, RollupPropagator};
use crate::rule_engine::{EventOutcome, RuleEngine};

/// Everything one event caused: recomputed rollup levels and automation
/// dispatches.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub rollups: Vec<LevelRollup>,
    pub outcomes: Vec<EventOutcome>,
}

/// Drives the rollup propagator and the rule engine over the change feed.
pub struct ChangeProcessor<R, T, N, L> {
    rollup: RollupPropagator<T>,
    engine: RuleEngine<R, T, N, L>,
}

impl<R, T, N, L> ChangeProcessor<R, T, N, L>
where
    R: AutomationRepository,
    T: TreeStore,
    N: Notifier,
    L: ExecutionLog,
{
    pub fn new(rollup: RollupPropagator<T>, engine: RuleEngine<R, T, N, L>) -> Self {
        Self { rollup, engine }
    }

    /// Handle one event: propagate rollups and evaluate automations.
    ///
    /// Both sides run concurrently; a failure on either side is logged and
    /// leaves the other side's results intact.
    pub async fn process(&self, event: &ChangeEvent) -> ProcessReport {
        let (rollups, outcomes) = tokio::join!(
            self.rollup.propagate_from(&event.path),
            self.engine.process_event(event),
        );
        let outcomes = outcomes.unwrap_or_else(|err| {
            tracing::error!(event = %event.id, error = %err, "automation evaluation failed");
            Vec::new()
        });
        ProcessReport { rollups, outcomes }
    }

    /// Consume the change feed until shutdown or channel close.
    ///
    /// A lagged receiver logs the missed count and keeps going; redelivered
    /// events are safe because dispatch dedupes on fingerprints.
    pub async fn run(
        &self,
        mut events: broadcast::Receiver<ChangeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("change processor shutting down");
                    break;
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        let report = self.process(&event).await;
                        tracing::debug!(
                            event = %event.id,
                            rollups = report.rollups.len(),
                            dispatches = report.outcomes.len(),
                            "processed change event"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "change feed lagged, continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("change feed closed, stopping processor");
                        break;
                    }
                },
            }
        }
    }
}

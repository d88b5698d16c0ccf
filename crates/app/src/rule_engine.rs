//! The rule engine — matching enabled automations against change events.
//!
//! For each event the engine loads the enabled automations, keeps the ones
//! whose primary trigger, scope, and conditions all agree with the event,
//! and hands each qualifying pair to the [`ActionDispatcher`]. Dispatch
//! failures are isolated per automation so one broken rule cannot starve
//! the rest.

use planhub_domain::activity::Snapshot;
use planhub_domain::automation::Automation;
use planhub_domain::error::PlanHubError;
use planhub_domain::event::ChangeEvent;
use planhub_domain::execution::ExecutionStatus;
use planhub_domain::id::AutomationId;
use planhub_domain::time;

use crate::dispatcher::{ActionDispatcher, DispatchOutcome};
use crate::ports::{AutomationRepository, ExecutionLog, Notifier, TreeStore};

/// The result of dispatching one automation for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub automation_id: AutomationId,
    pub dispatch: DispatchOutcome,
}

/// Matches change events against the stored automations and dispatches the
/// qualifying ones.
pub struct RuleEngine<R, T, N, L> {
    rules: R,
    dispatcher: ActionDispatcher<T, N, L>,
}

impl<R, T, N, L> RuleEngine<R, T, N, L>
where
    R: AutomationRepository,
    T: TreeStore,
    N: Notifier,
    L: ExecutionLog,
{
    pub fn new(rules: R, dispatcher: ActionDispatcher<T, N, L>) -> Self {
        Self { rules, dispatcher }
    }

    /// Evaluate every enabled automation against `event` and dispatch the
    /// ones that qualify.
    ///
    /// The condition context is built once per event; successful dispatches
    /// stamp the automation's `last_run`. A dispatch error is logged and the
    /// remaining automations still run.
    ///
    /// # Errors
    ///
    /// Fails when the enabled automations cannot be loaded.
    pub async fn process_event(
        &self,
        event: &ChangeEvent,
    ) -> Result<Vec<EventOutcome>, PlanHubError> {
        let automations = self.rules.get_enabled().await?;
        let context = event.condition_context();

        let mut outcomes = Vec::new();
        for automation in &automations {
            if !qualifies(automation, event, &context) {
                continue;
            }
            match self.dispatcher.dispatch(automation, event).await {
                Ok(dispatch) => {
                    if dispatch.status == ExecutionStatus::Succeeded {
                        if let Err(err) =
                            self.rules.touch_last_run(automation.id, time::now()).await
                        {
                            tracing::warn!(
                                automation = %automation.id,
                                error = %err,
                                "failed to stamp last_run"
                            );
                        }
                    }
                    outcomes.push(EventOutcome {
                        automation_id: automation.id,
                        dispatch,
                    });
                }
                Err(err) => {
                    tracing::error!(
                        automation = %automation.id,
                        event = %event.id,
                        error = %err,
                        "dispatch failed"
                    );
                }
            }
        }
        tracing::debug!(event = %event.id, matched = outcomes.len(), "event processed");
        Ok(outcomes)
    }
}

/// Whether `automation` should fire for `event`: the primary trigger
/// matches, the event path is inside the scope, and the conditions hold
/// against `context`.
fn qualifies(automation: &Automation, event: &ChangeEvent, context: &Snapshot) -> bool {
    let Some(trigger) = automation.primary_trigger() else {
        return false;
    };
    trigger.matches(event)
        && automation.scope.contains(&event.path)
        && automation.passes_conditions(context)
}

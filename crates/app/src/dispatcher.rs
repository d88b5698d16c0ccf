//! Idempotent action dispatch.
//!
//! One dispatch handles one (automation, event) pair, identified by its
//! [`EventFingerprint`]. The execution log's claim decides whether this
//! attempt runs the actions or suppresses a duplicate. Action failures are
//! isolated: a failing notification never blocks a child creation, and a
//! `Failed` attempt leaves the pair open for a later retry.

use std::borrow::Cow;

use planhub_domain::activity::{ActivityType, DEFAULT_STATUS, Snapshot, fields};
use planhub_domain::automation::{Action, Automation};
use planhub_domain::error::{ActionError, PlanHubError};
use planhub_domain::event::{ChangeEvent, ChangeKind};
use planhub_domain::execution::{EventFingerprint, ExecutionRecord, ExecutionStatus};
use planhub_domain::id::UserRef;
use planhub_domain::time;

use crate::ports::{Claim, ExecutionLog, Notifier, TreeStore};

/// What a dispatch did for one (automation, event) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Identity of the pair.
    pub fingerprint: EventFingerprint,
    /// Terminal status recorded for this attempt.
    pub status: ExecutionStatus,
    /// Actions attempted; zero when the dispatch was suppressed.
    pub actions_total: usize,
    /// Actions that failed.
    pub actions_failed: usize,
}

/// Executes an automation's actions at most once per qualifying event.
pub struct ActionDispatcher<T, N, L> {
    tree: T,
    notifier: N,
    log: L,
}

impl<T, N, L> ActionDispatcher<T, N, L>
where
    T: TreeStore,
    N: Notifier,
    L: ExecutionLog,
{
    pub fn new(tree: T, notifier: N, log: L) -> Self {
        Self {
            tree,
            notifier,
            log,
        }
    }

    /// Run `automation`'s actions for `event`, exactly once per fingerprint.
    ///
    /// The claim on the fingerprint is taken before any side effect. A lost
    /// claim (pair already succeeded, or another attempt in flight) records
    /// a `Skipped` attempt and performs nothing.
    ///
    /// # Errors
    ///
    /// Fails only on execution-log errors; action failures are captured in
    /// the outcome instead.
    pub async fn dispatch(
        &self,
        automation: &Automation,
        event: &ChangeEvent,
    ) -> Result<DispatchOutcome, PlanHubError> {
        let fingerprint = EventFingerprint::compute(automation.id, event);
        match self.log.begin(automation.id, &fingerprint, time::now()).await? {
            Claim::Claimed { attempt } => {
                let mut failed = 0usize;
                for action in &automation.actions {
                    if let Err(err) = self.execute(action, event).await {
                        failed += 1;
                        tracing::warn!(
                            automation = %automation.id,
                            fingerprint = %fingerprint,
                            action = %action,
                            error = %err,
                            "action failed"
                        );
                    }
                }
                let status = if failed == 0 {
                    ExecutionStatus::Succeeded
                } else {
                    ExecutionStatus::Failed
                };
                self.log.complete(attempt, status, time::now()).await?;
                Ok(DispatchOutcome {
                    fingerprint,
                    status,
                    actions_total: automation.actions.len(),
                    actions_failed: failed,
                })
            }
            claim @ (Claim::AlreadySucceeded | Claim::InFlight) => {
                tracing::debug!(
                    automation = %automation.id,
                    fingerprint = %fingerprint,
                    ?claim,
                    "duplicate dispatch suppressed"
                );
                let record =
                    ExecutionRecord::skipped(automation.id, fingerprint.clone(), time::now());
                self.log.append(record).await?;
                Ok(DispatchOutcome {
                    fingerprint,
                    status: ExecutionStatus::Skipped,
                    actions_total: 0,
                    actions_failed: 0,
                })
            }
        }
    }

    async fn execute(&self, action: &Action, event: &ChangeEvent) -> Result<(), PlanHubError> {
        match action {
            Action::Notify { recipients } => self.notify(recipients, event).await,
            Action::CreateChild { child_type, name } => {
                self.create_child(*child_type, name.as_deref(), event).await
            }
        }
    }

    /// Enqueue one notification per recipient.
    ///
    /// An empty recipient list falls back to the activity's assignee; no
    /// assignee either means there is nothing to do. Enqueue failures are
    /// logged per recipient and do not abort the remaining ones.
    async fn notify(
        &self,
        recipients: &[UserRef],
        event: &ChangeEvent,
    ) -> Result<(), PlanHubError> {
        let recipients: Vec<UserRef> = if recipients.is_empty() {
            event.after.assigned_to().into_iter().collect()
        } else {
            recipients.to_vec()
        };
        if recipients.is_empty() {
            tracing::debug!(path = %event.path, "notify action found no recipient");
            return Ok(());
        }

        let message = notification_message(event);
        let mut failed = 0usize;
        for recipient in &recipients {
            if let Err(err) = self.notifier.enqueue(recipient, &message).await {
                failed += 1;
                tracing::warn!(
                    recipient = %recipient,
                    error = %err,
                    "failed to enqueue notification"
                );
            }
        }
        if failed > 0 {
            return Err(ActionError::Notify {
                failed,
                total: recipients.len(),
            }
            .into());
        }
        Ok(())
    }

    async fn create_child(
        &self,
        child_type: ActivityType,
        name: Option<&str>,
        event: &ChangeEvent,
    ) -> Result<(), PlanHubError> {
        let name = name.map_or_else(|| format!("New {}", child_type.label()), str::to_owned);
        let child_fields = Snapshot::new()
            .with(fields::NAME, name)
            .with(fields::STATUS, DEFAULT_STATUS)
            .with(fields::ESTIMATED_MINUTES, 0.0)
            .with(fields::CREATED_AT, time::now().to_rfc3339());
        let path = self
            .tree
            .create_child(&event.path, child_type, child_fields)
            .await?;
        tracing::debug!(path = %path, "created child activity");
        Ok(())
    }
}

/// Human-readable line describing the event, used as the notification body.
fn notification_message(event: &ChangeEvent) -> String {
    let level = event.activity_type().label();
    let name = event
        .after
        .text(fields::NAME)
        .map_or_else(|| event.path.to_string(), Cow::into_owned);
    match event.kind {
        ChangeKind::Created => format!("{level} \"{name}\" was created"),
        ChangeKind::StatusChange => {
            let status = event.after.status().unwrap_or(Cow::Borrowed("unknown"));
            format!("{level} \"{name}\" moved to {status}")
        }
        ChangeKind::Assigned => match event.after.assigned_to() {
            Some(user) => format!("{level} \"{name}\" was assigned to {user}"),
            None => format!("{level} \"{name}\" was unassigned"),
        },
        ChangeKind::TimeScheduled => {
            let minutes = event.after.minutes(fields::ESTIMATED_MINUTES);
            format!("{level} \"{name}\" was estimated at {minutes} minutes")
        }
        ChangeKind::Hierarchical => format!("{level} \"{name}\" had its structure changed"),
    }
}

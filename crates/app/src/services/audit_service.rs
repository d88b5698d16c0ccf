//! Audit service — operator queries over the execution log.

use chrono::Duration;

use planhub_domain::error::PlanHubError;
use planhub_domain::execution::ExecutionRecord;
use planhub_domain::id::AutomationId;
use planhub_domain::time;

use crate::ports::ExecutionLog;

/// Read-side use-cases over the execution log, plus retention pruning.
pub struct AuditService<L> {
    log: L,
}

impl<L: ExecutionLog> AuditService<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    /// The most recent execution records across all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the execution log.
    pub async fn recent_executions(
        &self,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, PlanHubError> {
        self.log.recent(limit).await
    }

    /// The most recent execution records of one automation.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the execution log.
    pub async fn executions_for(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, PlanHubError> {
        self.log.find_by_automation(id, limit).await
    }

    /// Delete terminal records that finished before the retention window.
    ///
    /// In-flight attempts are never pruned. Returns how many records were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the execution log.
    #[tracing::instrument(skip(self))]
    pub async fn prune_expired(&self, retention: Duration) -> Result<u64, PlanHubError> {
        let cutoff = time::now() - retention;
        let removed = self.log.prune_older_than(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, "pruned expired execution records");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use planhub_domain::activity::Snapshot;
    use planhub_domain::event::{ChangeEvent, ChangeKind};
    use planhub_domain::execution::{EventFingerprint, ExecutionStatus};
    use planhub_domain::path::ActivityPath;

    use super::*;
    use crate::test_support::InMemoryLog;

    fn fingerprint(automation_id: AutomationId, task: &str) -> EventFingerprint {
        let event = ChangeEvent::new(
            ActivityPath::for_task("c1", "p1", None, task),
            ChangeKind::Created,
            None,
            Snapshot::new(),
        );
        EventFingerprint::compute(automation_id, &event)
    }

    fn finished_record(
        automation_id: AutomationId,
        task: &str,
        age: Duration,
        status: ExecutionStatus,
    ) -> ExecutionRecord {
        let at = time::now() - age;
        let mut record =
            ExecutionRecord::executing(automation_id, fingerprint(automation_id, task), at);
        record.finish(status, at);
        record
    }

    #[tokio::test]
    async fn should_list_recent_executions_newest_first() {
        let log = InMemoryLog::new();
        let automation_id = AutomationId::new();
        for (task, age) in [("t1", 3), ("t2", 2), ("t3", 1)] {
            log.append(finished_record(
                automation_id,
                task,
                Duration::minutes(age),
                ExecutionStatus::Succeeded,
            ))
            .await
            .unwrap();
        }
        let svc = AuditService::new(log);

        let recent = svc.recent_executions(2).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].fingerprint, fingerprint(automation_id, "t3"));
        assert_eq!(recent[1].fingerprint, fingerprint(automation_id, "t2"));
    }

    #[tokio::test]
    async fn should_scope_executions_to_one_automation() {
        let log = InMemoryLog::new();
        let first = AutomationId::new();
        let second = AutomationId::new();
        log.append(finished_record(
            first,
            "t1",
            Duration::minutes(2),
            ExecutionStatus::Succeeded,
        ))
        .await
        .unwrap();
        log.append(finished_record(
            second,
            "t1",
            Duration::minutes(1),
            ExecutionStatus::Failed,
        ))
        .await
        .unwrap();
        let svc = AuditService::new(log);

        let records = svc.executions_for(first, 10).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].automation_id, first);
    }

    #[tokio::test]
    async fn should_prune_only_expired_terminal_records() {
        let log = InMemoryLog::new();
        let automation_id = AutomationId::new();
        log.append(finished_record(
            automation_id,
            "t1",
            Duration::days(10),
            ExecutionStatus::Succeeded,
        ))
        .await
        .unwrap();
        // Old but still executing: never pruned.
        log.append(ExecutionRecord::executing(
            automation_id,
            fingerprint(automation_id, "t2"),
            time::now() - Duration::days(10),
        ))
        .await
        .unwrap();
        log.append(finished_record(
            automation_id,
            "t3",
            Duration::minutes(1),
            ExecutionStatus::Succeeded,
        ))
        .await
        .unwrap();
        let svc = AuditService::new(log);

        let removed = svc.prune_expired(Duration::days(7)).await.unwrap();

        assert_eq!(removed, 1);
        let remaining = svc.recent_executions(10).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(
            remaining
                .iter()
                .any(|r| r.status == ExecutionStatus::Executing)
        );
    }
}

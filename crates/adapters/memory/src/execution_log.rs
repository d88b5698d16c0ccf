//! In-memory execution log honouring the same claim contract as the
//! `SQLite` log.

use tokio::sync::Mutex;

use planhub_app::ports::{Claim, ExecutionLog};
use planhub_domain::error::{NotFoundError, PlanHubError};
use planhub_domain::execution::{EventFingerprint, ExecutionRecord, ExecutionStatus};
use planhub_domain::id::{AutomationId, ExecutionId};
use planhub_domain::time::Timestamp;

/// Execution log backed by a plain record list.
///
/// The claim check and the insert happen under one lock, so concurrent
/// `begin` calls for the same fingerprint serialise exactly like the
/// `SQLite` unique index does.
#[derive(Default)]
pub struct MemoryExecutionLog {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl MemoryExecutionLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionLog for MemoryExecutionLog {
    async fn begin(
        &self,
        automation_id: AutomationId,
        fingerprint: &EventFingerprint,
        at: Timestamp,
    ) -> Result<Claim, PlanHubError> {
        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.fingerprint == *fingerprint && r.status == ExecutionStatus::Succeeded)
        {
            return Ok(Claim::AlreadySucceeded);
        }
        if records
            .iter()
            .any(|r| r.fingerprint == *fingerprint && r.status == ExecutionStatus::Executing)
        {
            return Ok(Claim::InFlight);
        }

        let record = ExecutionRecord::executing(automation_id, fingerprint.clone(), at);
        let attempt = record.id;
        records.push(record);
        Ok(Claim::Claimed { attempt })
    }

    async fn complete(
        &self,
        attempt: ExecutionId,
        status: ExecutionStatus,
        at: Timestamp,
    ) -> Result<(), PlanHubError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == attempt)
            .ok_or_else(|| NotFoundError {
                entity: "ExecutionRecord",
                id: attempt.to_string(),
            })?;
        record.finish(status, at);
        Ok(())
    }

    async fn append(&self, record: ExecutionRecord) -> Result<(), PlanHubError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn lookup(
        &self,
        fingerprint: &EventFingerprint,
    ) -> Result<Option<ExecutionRecord>, PlanHubError> {
        let records = self.records.lock().await;
        let governing = records
            .iter()
            .find(|r| r.fingerprint == *fingerprint && r.status == ExecutionStatus::Succeeded)
            .or_else(|| {
                records.iter().find(|r| {
                    r.fingerprint == *fingerprint && r.status == ExecutionStatus::Executing
                })
            })
            .or_else(|| {
                records
                    .iter()
                    .filter(|r| r.fingerprint == *fingerprint)
                    .max_by_key(|r| r.started_at)
            });
        Ok(governing.cloned())
    }

    async fn find_by_automation(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, PlanHubError> {
        let records = self.records.lock().await;
        let mut matching: Vec<ExecutionRecord> = records
            .iter()
            .filter(|r| r.automation_id == id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ExecutionRecord>, PlanHubError> {
        let records = self.records.lock().await;
        let mut all: Vec<ExecutionRecord> = records.iter().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit);
        Ok(all)
    }

    async fn prune_older_than(&self, cutoff: Timestamp) -> Result<u64, PlanHubError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records
            .retain(|r| !(r.status.is_terminal() && r.finished_at.is_some_and(|at| at < cutoff)));
        Ok(u64::try_from(before - records.len()).unwrap_or(u64::MAX))
    }

    async fn recover_abandoned(&self, at: Timestamp) -> Result<u64, PlanHubError> {
        let mut records = self.records.lock().await;
        let mut recovered = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.status == ExecutionStatus::Executing)
        {
            record.finish(ExecutionStatus::Failed, at);
            recovered += 1;
        }
        Ok(recovered)
    }
}

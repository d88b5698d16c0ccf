//! `SQLite` implementation of [`ExecutionLog`].
//!
//! The claim in [`ExecutionLog::begin`] rides on a partial unique index over
//! `fingerprint` that only covers `executing` and `succeeded` rows. Inserting
//! the `executing` record is the compare-and-set: the insert either lands, or
//! collides with the row currently governing the fingerprint.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use planhub_app::ports::{Claim, ExecutionLog};
use planhub_domain::error::{NotFoundError, PlanHubError};
use planhub_domain::execution::{EventFingerprint, ExecutionRecord, ExecutionStatus};
use planhub_domain::id::{AutomationId, ExecutionId};
use planhub_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(ExecutionRecord);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<ExecutionRecord> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let automation_id: uuid::Uuid = row.try_get("automation_id")?;
        let fingerprint: String = row.try_get("fingerprint")?;
        let status: String = row.try_get("status")?;
        let started_at_str: String = row.try_get("started_at")?;
        let finished_at_str: Option<String> = row.try_get("finished_at")?;

        let fingerprint: EventFingerprint = fingerprint
            .parse()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let status: ExecutionStatus = status
            .parse()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let started_at = chrono::DateTime::parse_from_rfc3339(&started_at_str)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
            .to_utc();
        let finished_at = finished_at_str
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.to_utc())
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))
            })
            .transpose()?;

        Ok(Self(ExecutionRecord {
            id: ExecutionId::from_uuid(id),
            automation_id: AutomationId::from_uuid(automation_id),
            fingerprint,
            status,
            started_at,
            finished_at,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO execution_records (id, automation_id, fingerprint, status, started_at, finished_at)
    VALUES (?, ?, ?, ?, ?, ?)
";

const SELECT_HOLDER: &str = r"
    SELECT * FROM execution_records
    WHERE fingerprint = ? AND status IN ('executing', 'succeeded')
    ORDER BY CASE status WHEN 'succeeded' THEN 0 ELSE 1 END
    LIMIT 1
";

const SELECT_GOVERNING: &str = r"
    SELECT * FROM execution_records
    WHERE fingerprint = ?
    ORDER BY CASE status WHEN 'succeeded' THEN 0 WHEN 'executing' THEN 1 ELSE 2 END, started_at DESC
    LIMIT 1
";

const COMPLETE: &str = "UPDATE execution_records SET status = ?, finished_at = ? WHERE id = ?";
const SELECT_BY_AUTOMATION: &str =
    "SELECT * FROM execution_records WHERE automation_id = ? ORDER BY started_at DESC LIMIT ?";
const SELECT_RECENT: &str = "SELECT * FROM execution_records ORDER BY started_at DESC LIMIT ?";
const PRUNE: &str = r"
    DELETE FROM execution_records
    WHERE status IN ('succeeded', 'failed', 'skipped') AND finished_at < ?
";
const RECOVER: &str =
    "UPDATE execution_records SET status = 'failed', finished_at = ? WHERE status = 'executing'";

fn is_claim_conflict(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `SQLite`-backed execution log.
pub struct SqliteExecutionLog {
    pool: SqlitePool,
}

impl SqliteExecutionLog {
    /// Create a new execution log using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_record(&self, record: &ExecutionRecord) -> Result<(), sqlx::Error> {
        sqlx::query(INSERT)
            .bind(record.id.as_uuid())
            .bind(record.automation_id.as_uuid())
            .bind(record.fingerprint.as_str())
            .bind(record.status.as_str())
            .bind(record.started_at.to_rfc3339())
            .bind(record.finished_at.map(|ts| ts.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map(|_| ())
    }
}

impl ExecutionLog for SqliteExecutionLog {
    async fn begin(
        &self,
        automation_id: AutomationId,
        fingerprint: &EventFingerprint,
        at: Timestamp,
    ) -> Result<Claim, PlanHubError> {
        let record = ExecutionRecord::executing(automation_id, fingerprint.clone(), at);

        match self.insert_record(&record).await {
            Ok(()) => Ok(Claim::Claimed { attempt: record.id }),
            Err(err) if is_claim_conflict(&err) => {
                let holder: Option<Wrapper> = sqlx::query_as(SELECT_HOLDER)
                    .bind(fingerprint.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(StorageError::from)?;

                match Wrapper::maybe(holder).map(|r| r.status) {
                    Some(ExecutionStatus::Succeeded) => Ok(Claim::AlreadySucceeded),
                    // A claim released between the insert and this read also
                    // lands here; the next delivery gets a clean attempt.
                    _ => Ok(Claim::InFlight),
                }
            }
            Err(err) => Err(StorageError::from(err).into()),
        }
    }

    async fn complete(
        &self,
        attempt: ExecutionId,
        status: ExecutionStatus,
        at: Timestamp,
    ) -> Result<(), PlanHubError> {
        let result = sqlx::query(COMPLETE)
            .bind(status.as_str())
            .bind(at.to_rfc3339())
            .bind(attempt.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "ExecutionRecord",
                id: attempt.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn append(&self, record: ExecutionRecord) -> Result<(), PlanHubError> {
        self.insert_record(&record)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn lookup(
        &self,
        fingerprint: &EventFingerprint,
    ) -> Result<Option<ExecutionRecord>, PlanHubError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_GOVERNING)
            .bind(fingerprint.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn find_by_automation(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> Result<Vec<ExecutionRecord>, PlanHubError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_AUTOMATION)
            .bind(id.as_uuid())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ExecutionRecord>, PlanHubError> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn prune_older_than(&self, cutoff: Timestamp) -> Result<u64, PlanHubError> {
        let result = sqlx::query(PRUNE)
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }

    async fn recover_abandoned(&self, at: Timestamp) -> Result<u64, PlanHubError> {
        let result = sqlx::query(RECOVER)
            .bind(at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use planhub_domain::activity::{Snapshot, fields};
    use planhub_domain::event::{ChangeEvent, ChangeKind};
    use planhub_domain::time::now;

    async fn setup() -> SqliteExecutionLog {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteExecutionLog::new(db.pool().clone())
    }

    fn fingerprint_for(automation_id: AutomationId, task: &str) -> EventFingerprint {
        let event = ChangeEvent::new(
            format!("clients/c1/projects/p1/tasks/{task}")
                .parse()
                .unwrap(),
            ChangeKind::StatusChange,
            Some(Snapshot::new().with(fields::STATUS, "open")),
            Snapshot::new().with(fields::STATUS, "done"),
        );
        EventFingerprint::compute(automation_id, &event)
    }

    #[tokio::test]
    async fn should_claim_unseen_fingerprint() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        let claim = log.begin(automation_id, &fp, now()).await.unwrap();
        assert!(matches!(claim, Claim::Claimed { .. }));

        let governing = log.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(governing.status, ExecutionStatus::Executing);
        assert!(governing.finished_at.is_none());
    }

    #[tokio::test]
    async fn should_report_in_flight_while_claim_is_held() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        log.begin(automation_id, &fp, now()).await.unwrap();
        let second = log.begin(automation_id, &fp, now()).await.unwrap();
        assert_eq!(second, Claim::InFlight);
    }

    #[tokio::test]
    async fn should_suppress_fingerprint_forever_after_success() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        let Claim::Claimed { attempt } = log.begin(automation_id, &fp, now()).await.unwrap() else {
            panic!("expected a fresh claim");
        };
        log.complete(attempt, ExecutionStatus::Succeeded, now())
            .await
            .unwrap();

        let replay = log.begin(automation_id, &fp, now()).await.unwrap();
        assert_eq!(replay, Claim::AlreadySucceeded);

        let governing = log.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(governing.status, ExecutionStatus::Succeeded);
        assert!(governing.finished_at.is_some());
    }

    #[tokio::test]
    async fn should_release_claim_after_failure() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        let Claim::Claimed { attempt: first } = log.begin(automation_id, &fp, now()).await.unwrap()
        else {
            panic!("expected a fresh claim");
        };
        log.complete(first, ExecutionStatus::Failed, now())
            .await
            .unwrap();

        let retry = log.begin(automation_id, &fp, now()).await.unwrap();
        match retry {
            Claim::Claimed { attempt } => assert_ne!(attempt, first),
            other => panic!("expected a fresh claim after failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_prefer_success_over_later_attempts_in_lookup() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");
        let base = now();

        let Claim::Claimed { attempt } = log.begin(automation_id, &fp, base).await.unwrap() else {
            panic!("expected a fresh claim");
        };
        log.complete(attempt, ExecutionStatus::Failed, base)
            .await
            .unwrap();

        let Claim::Claimed { attempt } = log
            .begin(automation_id, &fp, base + chrono::Duration::seconds(1))
            .await
            .unwrap()
        else {
            panic!("expected a fresh claim");
        };
        log.complete(
            attempt,
            ExecutionStatus::Succeeded,
            base + chrono::Duration::seconds(2),
        )
        .await
        .unwrap();

        log.append(ExecutionRecord::skipped(
            automation_id,
            fp.clone(),
            base + chrono::Duration::seconds(3),
        ))
        .await
        .unwrap();

        let governing = log.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(governing.status, ExecutionStatus::Succeeded);
    }

    #[tokio::test]
    async fn should_append_skip_records_without_disturbing_claim() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        log.begin(automation_id, &fp, now()).await.unwrap();
        log.append(ExecutionRecord::skipped(automation_id, fp.clone(), now()))
            .await
            .unwrap();

        let governing = log.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(governing.status, ExecutionStatus::Executing);

        let attempts = log.find_by_automation(automation_id, 10).await.unwrap();
        assert_eq!(attempts.len(), 2);
    }

    #[tokio::test]
    async fn should_list_attempts_newest_first_with_limit() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let base = now();

        for (offset, task) in ["t1", "t2", "t3"].iter().enumerate() {
            let fp = fingerprint_for(automation_id, task);
            let at = base + chrono::Duration::seconds(i64::try_from(offset).unwrap());
            log.begin(automation_id, &fp, at).await.unwrap();
        }

        let attempts = log.find_by_automation(automation_id, 2).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].fingerprint, fingerprint_for(automation_id, "t3"));
        assert_eq!(attempts[1].fingerprint, fingerprint_for(automation_id, "t2"));
    }

    #[tokio::test]
    async fn should_scope_find_to_one_automation() {
        let log = setup().await;
        let ours = AutomationId::new();
        let theirs = AutomationId::new();

        log.begin(ours, &fingerprint_for(ours, "t1"), now())
            .await
            .unwrap();
        log.begin(theirs, &fingerprint_for(theirs, "t1"), now())
            .await
            .unwrap();

        let attempts = log.find_by_automation(ours, 10).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].automation_id, ours);
    }

    #[tokio::test]
    async fn should_list_recent_across_automations() {
        let log = setup().await;
        let first = AutomationId::new();
        let second = AutomationId::new();
        let base = now();

        log.begin(first, &fingerprint_for(first, "t1"), base)
            .await
            .unwrap();
        log.begin(
            second,
            &fingerprint_for(second, "t1"),
            base + chrono::Duration::seconds(1),
        )
        .await
        .unwrap();

        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].automation_id, second);
        assert_eq!(recent[1].automation_id, first);
    }

    #[tokio::test]
    async fn should_error_completing_unknown_attempt() {
        let log = setup().await;
        let err = log
            .complete(ExecutionId::new(), ExecutionStatus::Succeeded, now())
            .await
            .unwrap_err();
        assert!(matches!(err, PlanHubError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_release_abandoned_claims_on_recovery() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        // A claim from a previous process that never completed.
        log.begin(automation_id, &fp, now()).await.unwrap();

        let recovered = log.recover_abandoned(now()).await.unwrap();
        assert_eq!(recovered, 1);

        let governing = log.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(governing.status, ExecutionStatus::Failed);
        assert!(governing.finished_at.is_some());

        let retry = log.begin(automation_id, &fp, now()).await.unwrap();
        assert!(matches!(retry, Claim::Claimed { .. }));
    }

    #[tokio::test]
    async fn should_leave_terminal_records_alone_during_recovery() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let fp = fingerprint_for(automation_id, "t1");

        let Claim::Claimed { attempt } = log.begin(automation_id, &fp, now()).await.unwrap() else {
            panic!("expected a fresh claim");
        };
        log.complete(attempt, ExecutionStatus::Succeeded, now())
            .await
            .unwrap();

        let recovered = log.recover_abandoned(now()).await.unwrap();
        assert_eq!(recovered, 0);

        let governing = log.lookup(&fp).await.unwrap().unwrap();
        assert_eq!(governing.status, ExecutionStatus::Succeeded);
    }

    #[tokio::test]
    async fn should_prune_only_terminal_records_before_cutoff() {
        let log = setup().await;
        let automation_id = AutomationId::new();
        let old = now() - chrono::Duration::days(60);
        let cutoff = now() - chrono::Duration::days(30);

        let Claim::Claimed { attempt } = log
            .begin(automation_id, &fingerprint_for(automation_id, "t1"), old)
            .await
            .unwrap()
        else {
            panic!("expected a fresh claim");
        };
        log.complete(attempt, ExecutionStatus::Succeeded, old)
            .await
            .unwrap();

        // Stale claim that never completed; must survive the sweep.
        log.begin(automation_id, &fingerprint_for(automation_id, "t2"), old)
            .await
            .unwrap();

        let Claim::Claimed { attempt } = log
            .begin(automation_id, &fingerprint_for(automation_id, "t3"), now())
            .await
            .unwrap()
        else {
            panic!("expected a fresh claim");
        };
        log.complete(attempt, ExecutionStatus::Succeeded, now())
            .await
            .unwrap();

        let removed = log.prune_older_than(cutoff).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = log.find_by_automation(automation_id, 10).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(
            remaining
                .iter()
                .all(|r| r.status == ExecutionStatus::Executing
                    || r.finished_at.is_some_and(|at| at >= cutoff))
        );
    }
}

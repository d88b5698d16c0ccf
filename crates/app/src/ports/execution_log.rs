//! Execution log port — the append-only audit trail behind idempotent dispatch.

use std::future::Future;

use planhub_domain::error::PlanHubError;
use planhub_domain::execution::{EventFingerprint, ExecutionRecord, ExecutionStatus};
use planhub_domain::id::{AutomationId, ExecutionId};
use planhub_domain::time::Timestamp;

/// Outcome of [`ExecutionLog::begin`] — the idempotency compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// No governing record existed; the caller owns this attempt.
    Claimed {
        /// The freshly written `executing` record.
        attempt: ExecutionId,
    },
    /// A `succeeded` record already exists for this fingerprint.
    AlreadySucceeded,
    /// Another attempt currently holds an `executing` claim.
    InFlight,
}

/// Append-only log of dispatch attempts, keyed by event fingerprint.
///
/// `begin` is the dedup gate: of any number of concurrent calls for one
/// fingerprint, exactly one returns [`Claim::Claimed`] until that attempt
/// completes with a non-`succeeded` status. A `failed` completion releases
/// the fingerprint for a later attempt; `succeeded` holds it forever.
pub trait ExecutionLog {
    /// Atomically claim a fingerprint by writing an `executing` record.
    fn begin(
        &self,
        automation_id: AutomationId,
        fingerprint: &EventFingerprint,
        at: Timestamp,
    ) -> impl Future<Output = Result<Claim, PlanHubError>> + Send;

    /// Move a claimed attempt to a terminal status.
    fn complete(
        &self,
        attempt: ExecutionId,
        status: ExecutionStatus,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send;

    /// Append an already-terminal record (skips).
    fn append(
        &self,
        record: ExecutionRecord,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send;

    /// The record governing a fingerprint: a `succeeded` one if any, else a
    /// live `executing` claim, else the most recent attempt.
    fn lookup(
        &self,
        fingerprint: &EventFingerprint,
    ) -> impl Future<Output = Result<Option<ExecutionRecord>, PlanHubError>> + Send;

    /// One automation's attempts, newest first.
    fn find_by_automation(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionRecord>, PlanHubError>> + Send;

    /// Most recent attempts across all automations, newest first.
    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionRecord>, PlanHubError>> + Send;

    /// Delete terminal records that finished before `cutoff`; returns how
    /// many were removed. Live `executing` claims are never pruned.
    fn prune_older_than(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, PlanHubError>> + Send;

    /// Demote every `executing` record to `failed`, releasing its claim;
    /// returns how many were demoted.
    ///
    /// A claim left behind by a crashed process is indeterminate — its
    /// actions may or may not have run. Marking it `failed` makes the
    /// fingerprint claimable again on redelivery (at-least-once across
    /// crashes). Only call this at startup, before processing begins; a
    /// running engine's claims are live.
    fn recover_abandoned(
        &self,
        at: Timestamp,
    ) -> impl Future<Output = Result<u64, PlanHubError>> + Send;
}

impl<T: ExecutionLog + Send + Sync> ExecutionLog for std::sync::Arc<T> {
    fn begin(
        &self,
        automation_id: AutomationId,
        fingerprint: &EventFingerprint,
        at: Timestamp,
    ) -> impl Future<Output = Result<Claim, PlanHubError>> + Send {
        (**self).begin(automation_id, fingerprint, at)
    }

    fn complete(
        &self,
        attempt: ExecutionId,
        status: ExecutionStatus,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        (**self).complete(attempt, status, at)
    }

    fn append(
        &self,
        record: ExecutionRecord,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        (**self).append(record)
    }

    fn lookup(
        &self,
        fingerprint: &EventFingerprint,
    ) -> impl Future<Output = Result<Option<ExecutionRecord>, PlanHubError>> + Send {
        (**self).lookup(fingerprint)
    }

    fn find_by_automation(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionRecord>, PlanHubError>> + Send {
        (**self).find_by_automation(id, limit)
    }

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionRecord>, PlanHubError>> + Send {
        (**self).recent(limit)
    }

    fn prune_older_than(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, PlanHubError>> + Send {
        (**self).prune_older_than(cutoff)
    }

    fn recover_abandoned(
        &self,
        at: Timestamp,
    ) -> impl Future<Output = Result<u64, PlanHubError>> + Send {
        (**self).recover_abandoned(at)
    }
}

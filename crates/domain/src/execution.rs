//! Execution records — the audit trail behind exactly-once dispatch.
//!
//! Every dispatch attempt of an (automation, event) pair writes one record.
//! The pair is identified by an [`EventFingerprint`], a deterministic hash
//! that stays stable across event redeliveries, which is what lets the
//! dispatcher claim a pair once and skip duplicates.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::activity::Snapshot;
use crate::event::ChangeEvent;
use crate::id::{AutomationId, ExecutionId};
use crate::time::Timestamp;

/// Lifecycle of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Claimed and currently running actions.
    Executing,
    /// All actions completed.
    Succeeded,
    /// At least one action failed; the pair may be attempted again.
    Failed,
    /// Suppressed because the pair was already claimed or done.
    Skipped,
}

impl ExecutionStatus {
    /// Stable textual label, matching the serde form and DB columns.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executing => "executing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the attempt has reached its final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Executing)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored status label was not one of the known states.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for ExecutionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executing" => Ok(Self::Executing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Deterministic identity of an (automation, event) pair.
///
/// SHA-256 over the automation id, the canonical path, the change kind, and
/// the before/after status values. Redelivered copies of the same logical
/// mutation hash identically even though they carry fresh event ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventFingerprint(String);

impl EventFingerprint {
    /// Hash an (automation, event) pair.
    #[must_use]
    pub fn compute(automation_id: AutomationId, event: &ChangeEvent) -> Self {
        let before_status = event
            .before
            .as_ref()
            .and_then(Snapshot::status)
            .unwrap_or(Cow::Borrowed(""));
        let after_status = event.after.status().unwrap_or(Cow::Borrowed(""));

        let mut hasher = Sha256::new();
        hasher.update(automation_id.to_string());
        hasher.update(b"\n");
        hasher.update(event.path.to_string());
        hasher.update(b"\n");
        hasher.update(event.kind.as_str());
        hasher.update(b"\n");
        hasher.update(before_status.as_bytes());
        hasher.update(b"\n");
        hasher.update(after_status.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// View the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored fingerprint was not a 64-character hex digest.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("fingerprint must be 64 hex characters")]
pub struct InvalidFingerprint;

impl FromStr for EventFingerprint {
    type Err = InvalidFingerprint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidFingerprint)
        }
    }
}

impl TryFrom<String> for EventFingerprint {
    type Error = InvalidFingerprint;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventFingerprint> for String {
    fn from(fingerprint: EventFingerprint) -> Self {
        fingerprint.0
    }
}

/// One dispatch attempt of an (automation, event) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub automation_id: AutomationId,
    pub fingerprint: EventFingerprint,
    pub status: ExecutionStatus,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl ExecutionRecord {
    /// A freshly claimed attempt, still running.
    #[must_use]
    pub fn executing(
        automation_id: AutomationId,
        fingerprint: EventFingerprint,
        started_at: Timestamp,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            automation_id,
            fingerprint,
            status: ExecutionStatus::Executing,
            started_at,
            finished_at: None,
        }
    }

    /// A suppressed duplicate, terminal from the start.
    #[must_use]
    pub fn skipped(
        automation_id: AutomationId,
        fingerprint: EventFingerprint,
        at: Timestamp,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            automation_id,
            fingerprint,
            status: ExecutionStatus::Skipped,
            started_at: at,
            finished_at: Some(at),
        }
    }

    /// Move the attempt to a terminal status.
    pub fn finish(&mut self, status: ExecutionStatus, at: Timestamp) {
        self.status = status;
        self.finished_at = Some(at);
    }
}

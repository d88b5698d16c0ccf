//! Change events — records of tree mutations fed to the rule engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityType, Snapshot, fields};
use crate::id::EventId;
use crate::path::ActivityPath;
use crate::time::{Timestamp, now};

/// What kind of mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A node was created.
    Created,
    /// The `status` field changed.
    StatusChange,
    /// The `assigned_to` field changed.
    Assigned,
    /// The manual `estimated_minutes` field changed.
    TimeScheduled,
    /// A structural change below the node, e.g. a child added or removed.
    Hierarchical,
}

impl ChangeKind {
    /// Stable textual label, matching the serde form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChange => "status_change",
            Self::Assigned => "assigned",
            Self::TimeScheduled => "time_scheduled",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tree mutation, as observed by the change feed.
///
/// `after` reflects the node once the mutation is applied; `before` is the
/// prior snapshot when the feed has one (creations have none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: EventId,
    pub path: ActivityPath,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Snapshot>,
    pub after: Snapshot,
    pub occurred_at: Timestamp,
}

impl ChangeEvent {
    /// Build an event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(
        path: ActivityPath,
        kind: ChangeKind,
        before: Option<Snapshot>,
        after: Snapshot,
    ) -> Self {
        Self {
            id: EventId::new(),
            path,
            kind,
            before,
            after,
            occurred_at: now(),
        }
    }

    /// The tree level the event happened at.
    #[must_use]
    pub fn activity_type(&self) -> ActivityType {
        self.path.activity_type()
    }

    /// The field view conditions evaluate against.
    ///
    /// Starts from `after` and adds `previous_status` from the prior
    /// snapshot, so rules can condition on where a status transition came
    /// from.
    #[must_use]
    pub fn condition_context(&self) -> Snapshot {
        let mut context = self.after.clone();
        if let Some(previous) = self.before.as_ref().and_then(Snapshot::status) {
            let previous = previous.into_owned();
            context.insert(fields::PREVIOUS_STATUS, previous);
        }
        context
    }
}

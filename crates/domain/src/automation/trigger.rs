//! Trigger — the event pattern that activates an automation.

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityType, Snapshot};
use crate::event::{ChangeEvent, ChangeKind};

/// Describes which change events activate an automation.
///
/// A trigger names the tree level and change kind it listens for. For
/// status changes it can additionally pin the transition endpoints; the
/// endpoints are ignored for every other change kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// The tree level the event must happen at.
    pub activity_type: ActivityType,
    /// The change kind the event must carry.
    pub kind: ChangeKind,
    /// Optional: only match status changes leaving this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<String>,
    /// Optional: only match status changes arriving at this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<String>,
}

impl Trigger {
    /// Trigger on any event of `kind` at `activity_type`.
    #[must_use]
    pub fn on(activity_type: ActivityType, kind: ChangeKind) -> Self {
        Self {
            activity_type,
            kind,
            from_status: None,
            to_status: None,
        }
    }

    /// Trigger on creations at `activity_type`.
    #[must_use]
    pub fn created(activity_type: ActivityType) -> Self {
        Self::on(activity_type, ChangeKind::Created)
    }

    /// Trigger on status changes at `activity_type`, with optional
    /// transition endpoints.
    #[must_use]
    pub fn status_change(
        activity_type: ActivityType,
        from_status: Option<&str>,
        to_status: Option<&str>,
    ) -> Self {
        Self {
            activity_type,
            kind: ChangeKind::StatusChange,
            from_status: from_status.map(str::to_owned),
            to_status: to_status.map(str::to_owned),
        }
    }

    /// Check whether this trigger matches a given event.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if self.activity_type != event.activity_type() {
            return false;
        }
        if self.kind != event.kind {
            return false;
        }
        if self.kind == ChangeKind::StatusChange {
            if let Some(expected_to) = &self.to_status {
                let matches_to =
                    matches!(event.after.status(), Some(s) if s == expected_to.as_str());
                if !matches_to {
                    return false;
                }
            }
            if let Some(expected_from) = &self.from_status {
                let actual = event.before.as_ref().and_then(Snapshot::status);
                let matches_from = matches!(actual, Some(s) if s == expected_from.as_str());
                if !matches_from {
                    return false;
                }
            }
        }
        true
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.activity_type, self.kind)?;
        if self.from_status.is_some() || self.to_status.is_some() {
            let from = self.from_status.as_deref().unwrap_or("*");
            let to = self.to_status.as_deref().unwrap_or("*");
            write!(f, "({from}->{to})")?;
        }
        Ok(())
    }
}

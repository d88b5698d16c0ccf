//! Action — the effect performed when an automation fires.

use serde::{Deserialize, Serialize};

use crate::activity::ActivityType;
use crate::id::UserRef;

/// An operation to execute when the automation's trigger fires, the scope
/// matches, and the conditions are satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Enqueue a notification about the triggering activity.
    Notify {
        /// Explicit recipients; when empty, the activity's assignee is
        /// notified instead.
        #[serde(default)]
        recipients: Vec<UserRef>,
    },
    /// Create a child activity under the triggering node.
    CreateChild {
        /// Level of the child to create; must be a legal child of the
        /// trigger's level.
        child_type: ActivityType,
        /// Name for the new node; defaults to `"New <Type>"`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Notify { recipients } if recipients.is_empty() => {
                f.write_str("notify(assignee)")
            }
            Self::Notify { recipients } => write!(f, "notify({} recipients)", recipients.len()),
            Self::CreateChild { child_type, .. } => write!(f, "create_child({child_type})"),
        }
    }
}

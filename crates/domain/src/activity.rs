//! Activities — the node types of the work tree and their field snapshots.
//!
//! The tree store holds clients at the root, projects under clients, then
//! optionally products, tasks, and subtasks. Nodes are schemaless maps of
//! fields; [`Snapshot`] carries the subset of fields a change event or a
//! store read surfaces to the rule engine.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::UserRef;

/// Well-known field names used by triggers, conditions, and rollups.
pub mod fields {
    /// Display name of an activity.
    pub const NAME: &str = "name";
    /// Workflow status label, free-form per workspace.
    pub const STATUS: &str = "status";
    /// Priority label.
    pub const PRIORITY: &str = "priority";
    /// User the activity is assigned to.
    pub const ASSIGNED_TO: &str = "assigned_to";
    /// Manually entered estimate for this node, in minutes.
    pub const ESTIMATED_MINUTES: &str = "estimated_minutes";
    /// Derived sum of child estimates, maintained by the rollup propagator.
    pub const ESTIMATED_MINUTES_ROLLUP: &str = "estimated_minutes_rollup";
    /// Status before a status-change event, injected into condition contexts.
    pub const PREVIOUS_STATUS: &str = "previous_status";
    /// Last-modification stamp, RFC 3339.
    pub const UPDATED_AT: &str = "updated_at";
    /// Creation stamp, RFC 3339.
    pub const CREATED_AT: &str = "created_at";
}

/// Status given to activities created by automations.
pub const DEFAULT_STATUS: &str = "open";

/// The level of a node inside the work tree.
///
/// `Task` is special: tasks may sit directly under a project or under a
/// product, so a task path does not always carry a product segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Project,
    Product,
    Task,
    Subtask,
}

impl ActivityType {
    /// Name of the store collection holding nodes of this type.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Product => "products",
            Self::Task => "tasks",
            Self::Subtask => "subtasks",
        }
    }

    /// Capitalised label, used when naming auto-created children.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Product => "Product",
            Self::Task => "Task",
            Self::Subtask => "Subtask",
        }
    }

    /// Whether a node of this type may directly contain a `child` node.
    #[must_use]
    pub fn allows_child(self, child: Self) -> bool {
        matches!(
            (self, child),
            (Self::Project, Self::Product | Self::Task)
                | (Self::Product, Self::Task)
                | (Self::Task, Self::Subtask)
        )
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Project => "project",
            Self::Product => "product",
            Self::Task => "task",
            Self::Subtask => "subtask",
        };
        f.write_str(name)
    }
}

/// A single typed field value.
///
/// The tree store is schemaless, so a field can hold any JSON shape; the
/// variants cover the forms conditions and rollups know how to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Textual form of the value, if it has one.
    ///
    /// Strings borrow; numbers and booleans render to owned text. Structured
    /// JSON (objects, arrays, null) has no textual form.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s)),
            Self::Bool(b) => Some(Cow::Owned(b.to_string())),
            Self::Int(i) => Some(Cow::Owned(i.to_string())),
            Self::Float(f) => Some(Cow::Owned(f.to_string())),
            Self::Json(serde_json::Value::String(s)) => Some(Cow::Borrowed(s)),
            Self::Json(_) => None,
        }
    }

    /// Numeric form of the value, if it can be read as one.
    ///
    /// Numeric strings parse; everything else is `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => {
                // Estimates fit f64 comfortably.
                #[allow(clippy::cast_precision_loss)]
                let value = *i as f64;
                Some(value)
            }
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            Self::Json(serde_json::Value::Number(n)) => n.as_f64(),
            Self::Json(_) | Self::Bool(_) => None,
        }
    }

    /// Whether the value counts as empty for `is_empty` conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.is_empty(),
            Self::Json(serde_json::Value::Null) => true,
            Self::Json(serde_json::Value::String(s)) => s.is_empty(),
            Self::Json(serde_json::Value::Array(items)) => items.is_empty(),
            Self::Json(serde_json::Value::Object(map)) => map.is_empty(),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Json(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A point-in-time view of an activity's fields.
///
/// Events carry a snapshot of the node after the mutation (and optionally
/// before); condition evaluation and action execution read from snapshots
/// rather than from the live store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    fields: HashMap<String, FieldValue>,
}

impl Snapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Whether the field is present at all, regardless of its value.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Textual form of a field, if present and textual.
    #[must_use]
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// The workflow status, if set.
    #[must_use]
    pub fn status(&self) -> Option<Cow<'_, str>> {
        self.text(fields::STATUS)
    }

    /// The assignee, if set.
    #[must_use]
    pub fn assigned_to(&self) -> Option<UserRef> {
        self.text(fields::ASSIGNED_TO)
            .filter(|user| !user.is_empty())
            .map(|user| UserRef::from(user.into_owned()))
    }

    /// Numeric value of a field, treating absent or non-numeric as zero.
    ///
    /// Rollup sums use this so nodes without an estimate contribute nothing.
    #[must_use]
    pub fn minutes(&self, field: &str) -> f64 {
        self.get(field)
            .and_then(FieldValue::as_number)
            .unwrap_or(0.0)
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the snapshot has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `other` over this snapshot, replacing overlapping fields.
    pub fn merge(&mut self, other: Self) {
        self.fields.extend(other.fields);
    }
}

impl FromIterator<(String, FieldValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

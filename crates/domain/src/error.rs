//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`PlanHubError`] via `#[from]`. Storage adapters wrap their concrete
//! errors in the boxed [`PlanHubError::Storage`] variant so the domain stays
//! free of driver types.

use crate::activity::ActivityType;

/// Top-level error for planhub operations.
#[derive(Debug, thiserror::Error)]
pub enum PlanHubError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A tree path could not be parsed or extended.
    #[error("malformed path")]
    MalformedPath(#[from] MalformedPathError),

    /// An automation action was attempted but did not complete.
    #[error("action error")]
    Action(#[from] ActionError),

    /// A storage adapter failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations raised by [`validate`](crate::automation::Automation::validate)
/// and friends.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Automation names must be non-empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An automation must declare at least one trigger.
    #[error("automation must have at least one trigger")]
    NoTriggers,

    /// An automation must declare at least one action.
    #[error("automation must have at least one action")]
    NoActions,

    /// A create-child action names a child type the triggering level cannot
    /// contain.
    #[error("a {parent} cannot contain a {child}")]
    InvalidChildType {
        /// Level the automation triggers on.
        parent: ActivityType,
        /// Child type the action would create.
        child: ActivityType,
    },
}

/// A record lookup by identifier came back empty.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Human-readable record kind, e.g. `"Automation"`.
    pub entity: &'static str,
    /// The identifier that was looked up.
    pub id: String,
}

/// A string could not be resolved into a tree address, or a child path could
/// not legally be built from a parent.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed activity path {path:?}: {reason}")]
pub struct MalformedPathError {
    /// The offending path text.
    pub path: String,
    /// Which structural rule was broken.
    pub reason: &'static str,
}

/// An automation action ran but failed partway.
///
/// Action errors are recorded against the execution attempt; they never abort
/// the remaining actions of the same automation.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// One or more notification recipients could not be enqueued.
    #[error("{failed} of {total} notifications failed to enqueue")]
    Notify {
        /// Recipients whose enqueue failed.
        failed: usize,
        /// Recipients attempted.
        total: usize,
    },
}

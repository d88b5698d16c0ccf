//! Tree store port — the external key-path database holding the work tree.

use std::future::Future;

use planhub_domain::activity::{ActivityType, Snapshot};
use planhub_domain::error::PlanHubError;
use planhub_domain::path::ActivityPath;

/// Read/write access to the activity tree.
///
/// The store is an external collaborator: every write is an independent
/// operation (no cross-write atomicity is assumed) and the store's own
/// change feed is what drives the processor.
pub trait TreeStore {
    /// Read the node at `path`, if it exists.
    fn read(
        &self,
        path: &ActivityPath,
    ) -> impl Future<Output = Result<Option<Snapshot>, PlanHubError>> + Send;

    /// Merge `fields` into the node at `path`.
    fn write(
        &self,
        path: &ActivityPath,
        fields: Snapshot,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send;

    /// List the direct children of `parent` under one collection
    /// (`"products"`, `"tasks"`, `"subtasks"`), with their snapshots.
    fn children(
        &self,
        parent: &ActivityPath,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<(String, Snapshot)>, PlanHubError>> + Send;

    /// Create a child activity under `parent`; the store assigns the key
    /// and returns the new node's path.
    fn create_child(
        &self,
        parent: &ActivityPath,
        child_type: ActivityType,
        fields: Snapshot,
    ) -> impl Future<Output = Result<ActivityPath, PlanHubError>> + Send;
}

impl<T: TreeStore + Send + Sync> TreeStore for std::sync::Arc<T> {
    fn read(
        &self,
        path: &ActivityPath,
    ) -> impl Future<Output = Result<Option<Snapshot>, PlanHubError>> + Send {
        (**self).read(path)
    }

    fn write(
        &self,
        path: &ActivityPath,
        fields: Snapshot,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        (**self).write(path, fields)
    }

    fn children(
        &self,
        parent: &ActivityPath,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<(String, Snapshot)>, PlanHubError>> + Send {
        (**self).children(parent, collection)
    }

    fn create_child(
        &self,
        parent: &ActivityPath,
        child_type: ActivityType,
        fields: Snapshot,
    ) -> impl Future<Output = Result<ActivityPath, PlanHubError>> + Send {
        (**self).create_child(parent, child_type, fields)
    }
}

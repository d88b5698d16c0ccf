//! Estimate rollups — keeping derived totals in step with the tree.
//!
//! Every node may carry a manual `estimated_minutes` and a derived
//! `estimated_minutes_rollup`. The propagator owns the derived field: after
//! a change it recomputes each ancestor from its immediate children, one
//! level at a time, bottom-up. Manual estimates are never written here.

use planhub_domain::activity::{ActivityType, Snapshot, fields};
use planhub_domain::error::PlanHubError;
use planhub_domain::path::ActivityPath;
use planhub_domain::time;

use crate::ports::TreeStore;

/// One ancestor level recomputed by a [`RollupPropagator::propagate_from`]
/// walk, in walk order.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRollup {
    /// The parent whose rollup was rewritten.
    pub path: ActivityPath,
    /// The new rollup total, in minutes.
    pub total_minutes: f64,
}

/// Maintains `estimated_minutes_rollup` fields across the work tree.
pub struct RollupPropagator<T> {
    tree: T,
}

impl<T: TreeStore> RollupPropagator<T> {
    pub fn new(tree: T) -> Self {
        Self { tree }
    }

    /// Recompute one parent's rollup from its immediate children in
    /// `collection`.
    ///
    /// Sums `estimated_minutes + estimated_minutes_rollup` over the
    /// children, treating absent or non-numeric values as zero, and
    /// overwrites the parent's `estimated_minutes_rollup` with the total.
    /// Idempotent: unchanged children always produce the same total.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot list the children or write the parent.
    pub async fn recompute(
        &self,
        parent: &ActivityPath,
        collection: &str,
    ) -> Result<f64, PlanHubError> {
        let children = self.tree.children(parent, collection).await?;
        let total: f64 = children
            .iter()
            .map(|(_, child)| {
                child.minutes(fields::ESTIMATED_MINUTES)
                    + child.minutes(fields::ESTIMATED_MINUTES_ROLLUP)
            })
            .sum();
        let update = Snapshot::new()
            .with(fields::ESTIMATED_MINUTES_ROLLUP, total)
            .with(fields::UPDATED_AT, time::now().to_rfc3339());
        self.tree.write(parent, update).await?;
        tracing::debug!(parent = %parent, collection, total, "recomputed rollup");
        Ok(total)
    }

    /// Propagate a change at `path` up through its ancestors.
    ///
    /// Strictly bottom-up: a subtask change recomputes its task, then the
    /// task's product or project, then (under a product) the project. Each
    /// level completes before the next one reads it. A failing level is
    /// logged and stops the walk, so no inconsistent intermediate total is
    /// read upward; the levels recomputed so far are still returned.
    pub async fn propagate_from(&self, path: &ActivityPath) -> Vec<LevelRollup> {
        let mut rollups = Vec::new();
        for (parent, collection) in ancestor_steps(path) {
            match self.recompute(&parent, collection).await {
                Ok(total_minutes) => rollups.push(LevelRollup {
                    path: parent,
                    total_minutes,
                }),
                Err(err) => {
                    tracing::warn!(
                        parent = %parent,
                        collection,
                        error = %err,
                        "rollup halted, upper levels left untouched"
                    );
                    break;
                }
            }
        }
        rollups
    }
}

/// The (parent, collection) recompute steps for a change at `path`,
/// ordered bottom-up over the ancestor levels actually present.
fn ancestor_steps(path: &ActivityPath) -> Vec<(ActivityPath, &'static str)> {
    let mut steps = Vec::new();

    if let Some(task) = path.task_path() {
        if path.subtask().is_some() {
            steps.push((task, ActivityType::Subtask.collection()));
        }
        let task_parent = path.product_path().unwrap_or_else(|| path.project_path());
        steps.push((task_parent, ActivityType::Task.collection()));
    }
    if path.product().is_some() {
        steps.push((path.project_path(), ActivityType::Product.collection()));
    }

    steps
}

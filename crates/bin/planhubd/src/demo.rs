//! Demo seed — a small sample workspace for a fresh daemon.
//!
//! Structure is seeded quietly; the final writes go through the tree store
//! proper, so they land on the change feed and run through the engine. The
//! sample automations are only created when the database holds none, which
//! keeps their identities (and dispatch fingerprints) stable across restarts
//! of the same database file.

use planhub_adapter_memory::MemoryTreeStore;
use planhub_app::ports::{AutomationRepository, EventPublisher, TreeStore};
use planhub_app::services::AutomationService;
use planhub_domain::activity::{ActivityType, DEFAULT_STATUS, Snapshot, fields};
use planhub_domain::automation::{
    Action, Automation, ConditionGroup, ConditionOperator, ConditionRule, Trigger,
};
use planhub_domain::error::PlanHubError;
use planhub_domain::path::ActivityPath;

/// Seed the sample workspace and automations.
///
/// # Errors
///
/// Propagates repository and tree-store failures.
pub async fn seed<R, P>(
    automations: &AutomationService<R>,
    tree: &MemoryTreeStore<P>,
) -> Result<(), PlanHubError>
where
    R: AutomationRepository,
    P: EventPublisher + Send + Sync,
{
    if automations.list_automations().await?.is_empty() {
        for automation in sample_automations()? {
            let created = automations.create_automation(automation).await?;
            tracing::info!(name = %created.name, "created demo automation");
        }
    }

    let project = ActivityPath::for_project("acme", "website");
    tree.seed(
        &project,
        Snapshot::new().with(fields::NAME, "Website relaunch"),
    )
    .await;
    tree.seed(
        &ActivityPath::for_task("acme", "website", None, "content-migration"),
        Snapshot::new()
            .with(fields::NAME, "Content migration")
            .with(fields::STATUS, DEFAULT_STATUS)
            .with(fields::ESTIMATED_MINUTES, 120.0),
    )
    .await;

    // Live writes: a new task appears, then gets closed out.
    let task = ActivityPath::for_task("acme", "website", None, "launch-checklist");
    tree.write(
        &task,
        Snapshot::new()
            .with(fields::NAME, "Launch checklist")
            .with(fields::STATUS, DEFAULT_STATUS)
            .with(fields::PRIORITY, "high")
            .with(fields::ASSIGNED_TO, "alice")
            .with(fields::ESTIMATED_MINUTES, 45.0),
    )
    .await?;
    tree.write(&task, Snapshot::new().with(fields::STATUS, "done"))
        .await?;

    tracing::info!(project = %project, "demo workspace seeded");
    Ok(())
}

/// One notifier and one gated follow-up creator.
fn sample_automations() -> Result<Vec<Automation>, PlanHubError> {
    let notify = Automation::builder()
        .name("Notify assignee on new tasks")
        .trigger(Trigger::created(ActivityType::Task))
        .action(Action::Notify {
            recipients: Vec::new(),
        })
        .build()?;
    let follow_up = Automation::builder()
        .name("High-priority release check")
        .trigger(Trigger::status_change(ActivityType::Task, None, Some("done")))
        .conditions(ConditionGroup::all(vec![ConditionRule::comparing(
            fields::PRIORITY,
            ConditionOperator::Equals,
            "high",
        )]))
        .action(Action::CreateChild {
            child_type: ActivityType::Subtask,
            name: Some("Post-release check".to_string()),
        })
        .build()?;
    Ok(vec![notify, follow_up])
}

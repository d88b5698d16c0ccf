//! In-memory tree store with a change feed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use planhub_app::ports::{EventPublisher, TreeStore};
use planhub_domain::activity::{ActivityType, Snapshot, fields};
use planhub_domain::error::PlanHubError;
use planhub_domain::event::{ChangeEvent, ChangeKind};
use planhub_domain::path::ActivityPath;

/// Tree store held entirely in memory.
///
/// Every mutation is classified and published as a [`ChangeEvent`] through
/// the injected publisher; this is how the demo change feed is produced.
/// Writes that only touch bookkeeping fields (the rollup total, timestamps)
/// publish nothing, so rollup maintenance never re-enters the engine.
pub struct MemoryTreeStore<P> {
    nodes: RwLock<BTreeMap<String, Snapshot>>,
    next_key: AtomicUsize,
    publisher: P,
}

impl<P> MemoryTreeStore<P> {
    /// Create an empty store publishing its change feed to `publisher`.
    pub fn new(publisher: P) -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            next_key: AtomicUsize::new(1),
            publisher,
        }
    }

    /// Insert a node without publishing a change event.
    pub async fn seed(&self, path: &ActivityPath, snapshot: Snapshot) {
        self.nodes.write().await.insert(path.to_string(), snapshot);
    }

    /// Current snapshot of a node, for inspection.
    pub async fn snapshot(&self, path: &ActivityPath) -> Option<Snapshot> {
        self.nodes.read().await.get(&path.to_string()).cloned()
    }
}

/// Decide which change event a write amounts to, if any.
///
/// At most one event per write; a write touching several watched fields
/// reports the most significant one.
fn classify(
    previous: Option<&Snapshot>,
    written: &Snapshot,
    current: &Snapshot,
) -> Option<ChangeKind> {
    let Some(previous) = previous else {
        return Some(ChangeKind::Created);
    };
    if written.contains(fields::STATUS) && previous.status() != current.status() {
        return Some(ChangeKind::StatusChange);
    }
    if written.contains(fields::ASSIGNED_TO) && previous.assigned_to() != current.assigned_to() {
        return Some(ChangeKind::Assigned);
    }
    if written.contains(fields::ESTIMATED_MINUTES)
        && (previous.minutes(fields::ESTIMATED_MINUTES)
            - current.minutes(fields::ESTIMATED_MINUTES))
        .abs()
            > f64::EPSILON
    {
        return Some(ChangeKind::TimeScheduled);
    }
    None
}

impl<P: EventPublisher + Send + Sync> TreeStore for MemoryTreeStore<P> {
    async fn read(&self, path: &ActivityPath) -> Result<Option<Snapshot>, PlanHubError> {
        Ok(self.nodes.read().await.get(&path.to_string()).cloned())
    }

    async fn write(&self, path: &ActivityPath, fields: Snapshot) -> Result<(), PlanHubError> {
        let event = {
            let mut nodes = self.nodes.write().await;
            let key = path.to_string();
            let previous = nodes.get(&key).cloned();
            let entry = nodes.entry(key).or_default();
            entry.merge(fields.clone());
            let current = entry.clone();
            classify(previous.as_ref(), &fields, &current)
                .map(|kind| ChangeEvent::new(path.clone(), kind, previous, current))
        };

        if let Some(event) = event {
            self.publisher.publish(event).await?;
        }
        Ok(())
    }

    async fn children(
        &self,
        parent: &ActivityPath,
        collection: &str,
    ) -> Result<Vec<(String, Snapshot)>, PlanHubError> {
        let prefix = format!("{parent}/{collection}/");
        let nodes = self.nodes.read().await;
        Ok(nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .map(|(key, snapshot)| (key[prefix.len()..].to_string(), snapshot.clone()))
            .collect())
    }

    async fn create_child(
        &self,
        parent: &ActivityPath,
        child_type: ActivityType,
        fields: Snapshot,
    ) -> Result<ActivityPath, PlanHubError> {
        let key = format!("n{}", self.next_key.fetch_add(1, Ordering::Relaxed));
        let path = parent.child(child_type, key).map_err(PlanHubError::from)?;

        let (created, hierarchical) = {
            let mut nodes = self.nodes.write().await;
            nodes.insert(path.to_string(), fields.clone());
            let created = ChangeEvent::new(path.clone(), ChangeKind::Created, None, fields);
            // The parent's own fields are untouched; the event only signals
            // that its substructure changed.
            let hierarchical = nodes.get(&parent.to_string()).cloned().map(|snapshot| {
                ChangeEvent::new(
                    parent.clone(),
                    ChangeKind::Hierarchical,
                    Some(snapshot.clone()),
                    snapshot,
                )
            });
            (created, hierarchical)
        };

        self.publisher.publish(created).await?;
        if let Some(event) = hierarchical {
            self.publisher.publish(event).await?;
        }
        Ok(path)
    }
}

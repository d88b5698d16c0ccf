//! Shared in-memory fakes implementing the port traits.
//!
//! The dispatcher, rule engine, and processor tests all need the same
//! collaborators, so the fakes live here once. They follow the adapters'
//! contracts closely — the execution-log claim in particular behaves like
//! the persistent one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

use planhub_domain::activity::{ActivityType, Snapshot};
use planhub_domain::automation::Automation;
use planhub_domain::error::{NotFoundError, PlanHubError};
use planhub_domain::execution::{EventFingerprint, ExecutionRecord, ExecutionStatus};
use planhub_domain::id::{AutomationId, ExecutionId, UserRef};
use planhub_domain::path::ActivityPath;
use planhub_domain::time::Timestamp;

use crate::ports::{AutomationRepository, Claim, ExecutionLog, Notifier, TreeStore};

// ── In-memory tree store ───────────────────────────────────────────

/// Tree fake over a path-keyed map.
///
/// Setting `fail_children_under` makes `children` calls for that parent
/// fail, which is how rollup abort behaviour is exercised.
pub(crate) struct InMemoryTree {
    nodes: Mutex<BTreeMap<String, Snapshot>>,
    next_key: AtomicUsize,
    pub(crate) fail_children_under: Mutex<Option<String>>,
}

impl InMemoryTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            next_key: AtomicUsize::new(1),
            fail_children_under: Mutex::new(None),
        }
    }

    pub(crate) fn seed(&self, path: &ActivityPath, snapshot: Snapshot) {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), snapshot);
    }

    pub(crate) fn node(&self, path: &ActivityPath) -> Option<Snapshot> {
        self.nodes.lock().unwrap().get(&path.to_string()).cloned()
    }
}

impl TreeStore for InMemoryTree {
    fn read(
        &self,
        path: &ActivityPath,
    ) -> impl Future<Output = Result<Option<Snapshot>, PlanHubError>> + Send {
        let node = self.node(path);
        async { Ok(node) }
    }

    fn write(
        &self,
        path: &ActivityPath,
        fields: Snapshot,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.entry(path.to_string()).or_default().merge(fields);
        async { Ok(()) }
    }

    fn children(
        &self,
        parent: &ActivityPath,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<(String, Snapshot)>, PlanHubError>> + Send {
        let parent_key = parent.to_string();
        let failing = self
            .fail_children_under
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|p| p == parent_key);
        let result = if failing {
            Err(PlanHubError::Storage("children unavailable".into()))
        } else {
            let prefix = format!("{parent_key}/{collection}/");
            let nodes = self.nodes.lock().unwrap();
            Ok(nodes
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .filter(|(key, _)| !key[prefix.len()..].contains('/'))
                .map(|(key, snapshot)| (key[prefix.len()..].to_string(), snapshot.clone()))
                .collect())
        };
        async { result }
    }

    fn create_child(
        &self,
        parent: &ActivityPath,
        child_type: ActivityType,
        fields: Snapshot,
    ) -> impl Future<Output = Result<ActivityPath, PlanHubError>> + Send {
        let key = format!("n{}", self.next_key.fetch_add(1, Ordering::Relaxed));
        let result = parent
            .child(child_type, key)
            .map_err(PlanHubError::from)
            .map(|path| {
                self.nodes.lock().unwrap().insert(path.to_string(), fields);
                path
            });
        async { result }
    }
}

// ── In-memory automation repo ──────────────────────────────────────

pub(crate) struct InMemoryAutomations {
    store: Mutex<HashMap<AutomationId, Automation>>,
}

impl InMemoryAutomations {
    pub(crate) fn with(automations: Vec<Automation>) -> Self {
        let map: HashMap<_, _> = automations.into_iter().map(|a| (a.id, a)).collect();
        Self {
            store: Mutex::new(map),
        }
    }
}

impl AutomationRepository for InMemoryAutomations {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, PlanHubError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(automation.id, automation.clone());
        async { Ok(automation) }
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, PlanHubError>> + Send {
        let store = self.store.lock().unwrap();
        let r = store.get(&id).cloned();
        async { Ok(r) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, PlanHubError>> + Send {
        let store = self.store.lock().unwrap();
        let r: Vec<_> = store.values().cloned().collect();
        async { Ok(r) }
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Automation>, PlanHubError>> + Send {
        let store = self.store.lock().unwrap();
        let r: Vec<_> = store.values().filter(|a| a.enabled).cloned().collect();
        async { Ok(r) }
    }

    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, PlanHubError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.insert(automation.id, automation.clone());
        async { Ok(automation) }
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        let mut store = self.store.lock().unwrap();
        store.remove(&id);
        async { Ok(()) }
    }

    fn touch_last_run(
        &self,
        id: AutomationId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        let result = {
            let mut store = self.store.lock().unwrap();
            match store.get_mut(&id) {
                Some(automation) => {
                    automation.last_run = Some(at);
                    Ok(())
                }
                None => Err(NotFoundError {
                    entity: "Automation",
                    id: id.to_string(),
                }
                .into()),
            }
        };
        async { result }
    }
}

// ── Spy notifier ───────────────────────────────────────────────────

/// Records enqueued messages; recipients in `reject` fail their enqueue.
#[derive(Default)]
pub(crate) struct SpyNotifier {
    pub(crate) sent: Mutex<Vec<(UserRef, String)>>,
    pub(crate) reject: Mutex<HashSet<String>>,
}

impl SpyNotifier {
    pub(crate) fn rejecting(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: Mutex::new(recipients.iter().map(|r| (*r).to_string()).collect()),
        }
    }

    pub(crate) fn sent_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(user, _)| user.to_string())
            .collect()
    }
}

impl Notifier for SpyNotifier {
    fn enqueue(
        &self,
        recipient: &UserRef,
        message: &str,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        let result = if self.reject.lock().unwrap().contains(recipient.as_str()) {
            Err(PlanHubError::Storage("notification channel rejected".into()))
        } else {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.clone(), message.to_string()));
            Ok(())
        };
        async { result }
    }
}

// ── Gated notifier ─────────────────────────────────────────────────

/// Notifier whose `enqueue` parks until released, so a test can hold one
/// dispatch attempt mid-flight while racing a second one against it.
pub(crate) struct GatedNotifier {
    pub(crate) entered: Notify,
    pub(crate) release: Notify,
    pub(crate) sent: Mutex<Vec<(UserRef, String)>>,
}

impl GatedNotifier {
    pub(crate) fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl Notifier for GatedNotifier {
    fn enqueue(
        &self,
        recipient: &UserRef,
        message: &str,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        let recipient = recipient.clone();
        let message = message.to_string();
        async move {
            self.entered.notify_one();
            self.release.notified().await;
            self.sent.lock().unwrap().push((recipient, message));
            Ok(())
        }
    }
}

// ── In-memory execution log ────────────────────────────────────────

/// Execution log fake with the same claim contract as the persistent one:
/// a fingerprint is governed by at most one `executing` or `succeeded`
/// record at a time.
#[derive(Default)]
pub(crate) struct InMemoryLog {
    records: Mutex<Vec<ExecutionRecord>>,
    pub(crate) fail_begin_for: Mutex<Option<AutomationId>>,
}

impl InMemoryLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub(crate) fn count_with_status(&self, status: ExecutionStatus) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == status)
            .count()
    }
}

impl ExecutionLog for InMemoryLog {
    fn begin(
        &self,
        automation_id: AutomationId,
        fingerprint: &EventFingerprint,
        at: Timestamp,
    ) -> impl Future<Output = Result<Claim, PlanHubError>> + Send {
        let result = if *self.fail_begin_for.lock().unwrap() == Some(automation_id) {
            Err(PlanHubError::Storage("execution log unavailable".into()))
        } else {
            let mut records = self.records.lock().unwrap();
            let succeeded = records
                .iter()
                .any(|r| &r.fingerprint == fingerprint && r.status == ExecutionStatus::Succeeded);
            let executing = records
                .iter()
                .any(|r| &r.fingerprint == fingerprint && r.status == ExecutionStatus::Executing);
            if succeeded {
                Ok(Claim::AlreadySucceeded)
            } else if executing {
                Ok(Claim::InFlight)
            } else {
                let record = ExecutionRecord::executing(automation_id, fingerprint.clone(), at);
                let attempt = record.id;
                records.push(record);
                Ok(Claim::Claimed { attempt })
            }
        };
        async { result }
    }

    fn complete(
        &self,
        attempt: ExecutionId,
        status: ExecutionStatus,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        let result = {
            let mut records = self.records.lock().unwrap();
            match records.iter_mut().find(|r| r.id == attempt) {
                Some(record) => {
                    record.finish(status, at);
                    Ok(())
                }
                None => Err(NotFoundError {
                    entity: "ExecutionRecord",
                    id: attempt.to_string(),
                }
                .into()),
            }
        };
        async { result }
    }

    fn append(
        &self,
        record: ExecutionRecord,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        self.records.lock().unwrap().push(record);
        async { Ok(()) }
    }

    fn lookup(
        &self,
        fingerprint: &EventFingerprint,
    ) -> impl Future<Output = Result<Option<ExecutionRecord>, PlanHubError>> + Send {
        let governing = {
            let records = self.records.lock().unwrap();
            let matching: Vec<ExecutionRecord> = records
                .iter()
                .filter(|r| &r.fingerprint == fingerprint)
                .cloned()
                .collect();
            matching
                .iter()
                .find(|r| r.status == ExecutionStatus::Succeeded)
                .or_else(|| {
                    matching
                        .iter()
                        .find(|r| r.status == ExecutionStatus::Executing)
                })
                .or_else(|| matching.iter().max_by_key(|r| r.started_at))
                .cloned()
        };
        async { Ok(governing) }
    }

    fn find_by_automation(
        &self,
        id: AutomationId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionRecord>, PlanHubError>> + Send {
        let mut matching: Vec<ExecutionRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.automation_id == id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        async { Ok(matching) }
    }

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ExecutionRecord>, PlanHubError>> + Send {
        let mut all: Vec<ExecutionRecord> = self.records.lock().unwrap().clone();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit);
        async { Ok(all) }
    }

    fn prune_older_than(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, PlanHubError>> + Send {
        let removed = {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| {
                !(r.status.is_terminal() && r.finished_at.is_some_and(|at| at < cutoff))
            });
            u64::try_from(before - records.len()).unwrap()
        };
        async move { Ok(removed) }
    }

    fn recover_abandoned(
        &self,
        at: Timestamp,
    ) -> impl Future<Output = Result<u64, PlanHubError>> + Send {
        let recovered = {
            let mut records = self.records.lock().unwrap();
            let mut count = 0;
            for record in records
                .iter_mut()
                .filter(|r| r.status == ExecutionStatus::Executing)
            {
                record.finish(ExecutionStatus::Failed, at);
                count += 1;
            }
            count
        };
        async move { Ok(recovered) }
    }
}

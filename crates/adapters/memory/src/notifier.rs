//! In-memory notifier that records deliveries.

use tokio::sync::Mutex;

use planhub_app::ports::Notifier;
use planhub_domain::error::PlanHubError;
use planhub_domain::id::UserRef;

/// Notifier that appends every message to an in-memory outbox.
#[derive(Default)]
pub struct MemoryNotifier {
    outbox: Mutex<Vec<(UserRef, String)>>,
}

impl MemoryNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages enqueued so far, in order.
    pub async fn sent(&self) -> Vec<(UserRef, String)> {
        self.outbox.lock().await.clone()
    }
}

impl Notifier for MemoryNotifier {
    async fn enqueue(&self, recipient: &UserRef, message: &str) -> Result<(), PlanHubError> {
        self.outbox
            .lock()
            .await
            .push((recipient.clone(), message.to_owned()));
        Ok(())
    }
}

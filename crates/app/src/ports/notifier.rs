//! Notification port — fire-and-forget delivery to users.

use std::future::Future;

use planhub_domain::error::PlanHubError;
use planhub_domain::id::UserRef;

/// Enqueues notifications for delivery by an external channel.
///
/// Fire-and-forget from the dispatcher's point of view: success means the
/// message was accepted for delivery, not that it arrived.
pub trait Notifier {
    /// Queue one message for one recipient.
    fn enqueue(
        &self,
        recipient: &UserRef,
        message: &str,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send;
}

impl<T: Notifier + Send + Sync> Notifier for std::sync::Arc<T> {
    fn enqueue(
        &self,
        recipient: &UserRef,
        message: &str,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        (**self).enqueue(recipient, message)
    }
}

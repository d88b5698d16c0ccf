//! Event bus port — publish/subscribe for tree change events.

use std::future::Future;

use planhub_domain::error::PlanHubError;
use planhub_domain::event::ChangeEvent;

/// Publishes change events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(
        &self,
        event: ChangeEvent,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: ChangeEvent,
    ) -> impl Future<Output = Result<(), PlanHubError>> + Send {
        (**self).publish(event)
    }
}

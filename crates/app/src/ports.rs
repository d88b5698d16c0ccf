//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod automation_repo;
pub mod event_bus;
pub mod execution_log;
pub mod notifier;
pub mod tree_store;

pub use automation_repo::AutomationRepository;
pub use event_bus::EventPublisher;
pub use execution_log::{Claim, ExecutionLog};
pub use notifier::Notifier;
pub use tree_store::TreeStore;

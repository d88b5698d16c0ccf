//! # planhub-adapter-memory
//!
//! In-memory adapter — tree store, execution log, and notifier backed by
//! plain collections behind tokio locks.
//!
//! ## Responsibilities
//! - Provide a demo-mode tree store that publishes classified change events
//! - Provide an execution log honouring the same claim contract as the
//!   `SQLite` log
//! - Record notifications for inspection in demos and tests
//!
//! ## Dependency rule
//! Depends on `planhub-app` (for port traits) and `planhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod execution_log;
pub mod notifier;
pub mod tree_store;

pub use execution_log::MemoryExecutionLog;
pub use notifier::MemoryNotifier;
pub use tree_store::MemoryTreeStore;

//! # planhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `AutomationRepository` — CRUD + enabled-only iteration over automations
//!   - `TreeStore` — read/write access to the external activity tree
//!   - `ExecutionLog` — append & claim execution records (idempotency)
//!   - `Notifier` — enqueue notifications for delivery
//! - Define **driving/inbound ports** as use-case structs:
//!   - `RuleEngine` — match triggers, filter scope, evaluate conditions
//!   - `ActionDispatcher` — execute actions at most once per fingerprint
//!   - `RollupPropagator` — bottom-up estimate rollups
//!   - `ChangeProcessor` — feed both consumers from the change stream
//!   - `AutomationService` / `AuditService` — operator-facing use-cases
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `planhub-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod dispatcher;
pub mod event_bus;
pub mod ports;
pub mod processor;
pub mod rollup;
pub mod rule_engine;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

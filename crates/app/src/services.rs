//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod audit_service;
pub mod automation_service;

pub use audit_service::AuditService;
pub use automation_service::AutomationService;

//! # planhub-domain
//!
//! Pure domain model for the planhub work-tracking automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Activity paths** (typed addresses into the client → project →
//!   product → task → subtask tree)
//! - Define **Activities** (the tree nodes and their field snapshots)
//! - Define **Change events** (records of tree mutations)
//! - Define **Automations** (trigger → condition → action rules with a scope)
//! - Define **Execution records** (per-dispatch audit rows keyed by event
//!   fingerprint)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod activity;
pub mod automation;
pub mod event;
pub mod execution;
pub mod path;

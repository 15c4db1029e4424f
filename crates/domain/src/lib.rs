//! # whoshome-domain
//!
//! Pure domain model for whoshome, a local-network presence watcher that
//! fires a configured command when monitored devices join or leave the
//! neighborhood.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Parse **neighbor records** (one line of the kernel neighbor table each)
//! - Define the **known-machine alias table** (names bound to MAC addresses)
//! - Classify records through the **filter pipeline** (excluded / matched /
//!   no match, reduced to a single presence signal)
//! - Drive the **debounce state machine** (bounded result history, at-most-once
//!   command dispatch, stderr rollback)
//! - Hold the persisted **state snapshot** (section name → debounce state)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod debounce;
pub mod error;
pub mod filter;
pub mod machines;
pub mod neighbor;
pub mod state;
pub mod time;

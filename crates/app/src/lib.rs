//! # whoshome-app
//!
//! Application layer for whoshome: the per-cycle trigger engine and the port
//! traits it drives.
//!
//! ## Responsibilities
//! - Define **ports** — trait boundaries for the neighbor source, name
//!   resolver, command launcher, state store, and cron gate
//! - Define the validated runtime **section** value
//! - Run the **trigger engine**: one pass over all sections per cycle, with a
//!   per-cycle neighbor cache, debounce transitions, asynchronous dispatch,
//!   and stderr rollback
//!
//! ## Dependency rule
//! Depends only on `whoshome-domain`. Adapters implement the ports defined
//! here; the binary wires everything together.

pub mod engine;
pub mod ports;
pub mod section;

pub use engine::{CycleReport, SectionOutcome, SectionStatus, TriggerEngine};
pub use section::Section;

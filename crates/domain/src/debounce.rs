//! Debounce state machine — turns a noisy per-cycle presence signal into a
//! stable, at-most-once command dispatch.
//!
//! States are implicit in the stored history + last-command pair; one
//! transition happens per section per cycle:
//!
//! ```text
//!                          count < threshold
//!   apply(result) ────────────────────────────────► Observing (no dispatch)
//!        │
//!        │  count == threshold, command == last dispatched
//!        ├────────────────────────────────────────► AlreadyFired (no dispatch)
//!        │
//!        │  count == threshold, command != last dispatched
//!        └────────────────────────────────────────► Fire (record, then dispatch)
//! ```
//!
//! The history is a sliding window of the last `threshold` results, not a
//! counter: a section flipping results rapidly resets its effective count
//! naturally as older entries fall out of the window. Requiring the window
//! to agree absorbs transient flapping of the underlying neighbor table
//! without a strict consecutive-run check.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of one polling cycle for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// At least one record matched the section's filters.
    Neighbor,
    /// No record matched.
    NoNeighbor,
}

impl Presence {
    /// Map the filter pipeline's aggregated boolean to a cycle result.
    #[must_use]
    pub fn from_present(present: bool) -> Self {
        if present { Self::Neighbor } else { Self::NoNeighbor }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neighbor => f.write_str("neighbor"),
            Self::NoNeighbor => f.write_str("no_neighbor"),
        }
    }
}

/// Transition taken by [`SectionState::apply`] for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The window does not yet hold `threshold` samples of the result.
    Observing {
        /// Samples of the current result in the window.
        count: usize,
        /// Samples required before acting.
        threshold: usize,
    },
    /// Threshold reached, but the command was already dispatched for this
    /// steady state. No redispatch.
    AlreadyFired,
    /// Threshold reached and the command differs from the last dispatched
    /// one. The intent is recorded before the command runs, so a crash
    /// mid-dispatch cannot double-fire on restart.
    Fire,
}

/// Persistent per-section record: a bounded result history plus the last
/// dispatched command.
///
/// Created lazily on first reference (empty history, no last command) and
/// kept across cycles until a stderr rollback clears the command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionState {
    results: Vec<Presence>,
    last_command: Option<String>,
}

impl SectionState {
    /// Record one cycle's result and decide what to do about it.
    ///
    /// Appends `result`, truncates the history to the most recent
    /// `threshold` entries, and compares the in-window count against the
    /// threshold. On [`Transition::Fire`] the command is recorded as
    /// dispatched before the caller runs it.
    pub fn apply(
        &mut self,
        result: Presence,
        command: Option<&str>,
        threshold: usize,
    ) -> Transition {
        self.results.push(result);
        if self.results.len() > threshold {
            let excess = self.results.len() - threshold;
            self.results.drain(..excess);
        }
        let count = self.results.iter().filter(|entry| **entry == result).count();
        if count != threshold {
            return Transition::Observing { count, threshold };
        }
        if self.last_command.as_deref() == command {
            return Transition::AlreadyFired;
        }
        self.last_command = command.map(str::to_owned);
        Transition::Fire
    }

    /// The stored window, oldest first.
    #[must_use]
    pub fn results(&self) -> &[Presence] {
        &self.results
    }

    /// The last dispatched command, if any.
    #[must_use]
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Forget the last dispatched command so the next threshold hit fires
    /// again. Used for stderr rollback; the result history is never rewound.
    pub fn clear_last_command(&mut self) {
        self.last_command = None;
    }
}

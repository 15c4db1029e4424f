//! Persisted snapshot — keyed store of per-section debounce state.
//!
//! The snapshot is exclusively owned by the trigger engine for the duration
//! of one cycle: loaded at cycle start, mutated in place, flushed at cycle
//! end. A cycle that aborts must not flush, preserving the last good
//! persisted state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::debounce::SectionState;

/// All persisted section state, keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSnapshot {
    sections: BTreeMap<String, SectionState>,
}

impl StateSnapshot {
    /// Section entry, created empty on first reference.
    pub fn section_mut(&mut self, name: &str) -> &mut SectionState {
        self.sections.entry(name.to_owned()).or_default()
    }

    /// Section entry, if one has been recorded.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionState> {
        self.sections.get(name)
    }

    /// Number of sections with recorded state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether any section state has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

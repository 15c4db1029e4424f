//! State store port — persistence for the per-section debounce snapshot.

use std::future::Future;

use whoshome_domain::error::WatchError;
use whoshome_domain::state::StateSnapshot;

/// Loads and saves the keyed snapshot at cycle boundaries.
///
/// The engine owns the snapshot exclusively for the whole cycle; the store
/// is only touched at the boundaries, and a cycle that aborts never saves.
pub trait StateStore {
    /// Load the persisted snapshot. A store that has never been written
    /// loads as an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::StateStore`] when the store exists but cannot
    /// be read or parsed. This is fatal for the cycle.
    fn load(&self) -> impl Future<Output = Result<StateSnapshot, WatchError>> + Send;

    /// Replace the persisted snapshot atomically.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::StateStore`] when the snapshot cannot be
    /// written. This is fatal for the cycle.
    fn save(
        &self,
        snapshot: &StateSnapshot,
    ) -> impl Future<Output = Result<(), WatchError>> + Send;
}

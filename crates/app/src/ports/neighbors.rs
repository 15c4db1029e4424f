//! Neighbor source port — the external "list neighbors" command.

use std::future::Future;

use whoshome_domain::error::WatchError;
use whoshome_domain::neighbor::NeighborRecord;

/// Produces the current neighbor table, one record per known link-layer
/// neighbor, optionally restricted to a device.
///
/// The engine caches results per device for the duration of one cycle, so
/// sections sharing a device do not repeat the external query.
pub trait NeighborSource {
    /// List the neighbor table.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Neighbors`] when the external listing cannot be
    /// obtained at all. Individual malformed lines are not errors — they
    /// degrade to records with empty address/MAC fields.
    fn list_neighbors(
        &self,
        device: Option<&str>,
    ) -> impl Future<Output = Result<Vec<NeighborRecord>, WatchError>> + Send;
}

//! Neighbor table records.
//!
//! A [`NeighborRecord`] is one parsed line of the kernel neighbor table, as
//! printed by `ip neigh show`. Lines are whitespace-tokenized: the first
//! token is the IP address, the token following the `lladdr` marker is the
//! link-layer address, and the trailing token is the reachability state.
//! Malformed lines degrade to empty address/MAC fields instead of erroring —
//! regex and substring filters still see the verbatim line.

/// Reachability of a neighbor entry, from the trailing state token.
///
/// Only [`Reachable`](Self::Reachable) and [`Stale`](Self::Stale) qualify a
/// record as present. The remaining states describe entries that are being
/// probed, have failed, or are statically configured, and never count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityState {
    /// Statically configured entry, never expires.
    Permanent,
    /// Valid entry on an interface without address resolution.
    Noarp,
    /// Confirmed reachable.
    Reachable,
    /// Was reachable, confirmation has lapsed.
    Stale,
    /// Waiting before re-probing.
    Delay,
    /// Actively being probed.
    Probe,
    /// Resolution failed.
    Failed,
    /// Resolution in progress, no answer yet.
    Incomplete,
    /// Entry exists but carries no state.
    None,
    /// Unrecognised or missing state token.
    Unknown,
}

impl ReachabilityState {
    /// Parse a state token as printed by `ip neigh`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "PERMANENT" => Self::Permanent,
            "NOARP" => Self::Noarp,
            "REACHABLE" => Self::Reachable,
            "STALE" => Self::Stale,
            "DELAY" => Self::Delay,
            "PROBE" => Self::Probe,
            "FAILED" => Self::Failed,
            "INCOMPLETE" => Self::Incomplete,
            "NONE" => Self::None,
            _ => Self::Unknown,
        }
    }

    /// Whether the state qualifies the neighbor as present on the network.
    #[must_use]
    pub fn is_present(self) -> bool {
        matches!(self, Self::Reachable | Self::Stale)
    }
}

/// One parsed line of the neighbor table.
///
/// Immutable; created once per polling cycle per device and discarded at
/// cycle end. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    /// Verbatim source line, used for regex and substring matching.
    pub raw_line: String,
    /// IP address, empty if unparsable.
    pub address: String,
    /// Link-layer address, empty if unparsable.
    pub mac_address: String,
    /// Parsed trailing state token.
    pub state: ReachabilityState,
}

impl NeighborRecord {
    /// Parse a neighbor table line.
    ///
    /// Lines without an `lladdr` marker (e.g. `FAILED` entries) yield empty
    /// address and MAC fields. This never fails — unparsable input degrades
    /// to empty fields and an [`Unknown`](ReachabilityState::Unknown) state.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let state = tokens
            .last()
            .map_or(ReachabilityState::Unknown, |token| {
                ReachabilityState::from_token(token)
            });
        let mac = tokens
            .iter()
            .position(|token| *token == "lladdr")
            .and_then(|marker| tokens.get(marker + 1))
            .copied();
        let (address, mac_address) = match mac {
            Some(mac) => (
                tokens.first().copied().unwrap_or_default().to_owned(),
                mac.to_owned(),
            ),
            Option::None => (String::new(), String::new()),
        };
        Self {
            raw_line: line.to_owned(),
            address,
            mac_address,
            state,
        }
    }

    /// Whether this record's reachability state qualifies as present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.state.is_present()
    }
}

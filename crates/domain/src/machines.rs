//! Known-machine alias table — human names bound to MAC addresses.
//!
//! Names are looked up case-insensitively; MAC addresses are normalised to
//! lowercase so comparisons against parsed neighbor records never depend on
//! how either side was written in the configuration.

use std::collections::{HashMap, HashSet};

/// Alias table loaded once per cycle from configuration. Read-only during
/// classification.
#[derive(Debug, Clone, Default)]
pub struct KnownMachines {
    by_name: HashMap<String, String>,
    by_mac: HashMap<String, String>,
}

impl KnownMachines {
    /// Build the table from `(name, mac)` pairs.
    pub fn new(mapping: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_mac = HashMap::new();
        for (name, mac) in mapping {
            let mac = mac.to_ascii_lowercase();
            by_name.insert(name.to_lowercase(), mac.clone());
            by_mac.insert(mac, name);
        }
        Self { by_name, by_mac }
    }

    /// Number of aliases in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the table holds no aliases at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// The MAC bound to `name`, if any. Lookup is case-insensitive.
    #[must_use]
    pub fn mac_for(&self, name: &str) -> Option<&str> {
        self.by_name.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The alias bound to `mac`, if any, as written in the configuration.
    #[must_use]
    pub fn name_for_mac(&self, mac: &str) -> Option<&str> {
        self.by_mac
            .get(&mac.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Resolve a list of configured names to the set of MACs they are bound
    /// to. Names without a binding are dropped silently; the result may be
    /// empty.
    #[must_use]
    pub fn resolve(&self, names: &[String]) -> HashSet<String> {
        names
            .iter()
            .filter_map(|name| self.mac_for(name))
            .map(str::to_owned)
            .collect()
    }
}

impl FromIterator<(String, String)> for KnownMachines {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

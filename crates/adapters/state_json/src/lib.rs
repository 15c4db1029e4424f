//! # whoshome-adapter-state-json
//!
//! Flat JSON file implementation of the state store port. The snapshot is a
//! single keyed record (section name → results + last command) serialized
//! with `serde_json` and replaced atomically: the new content is written to
//! a sibling temp file which is then renamed over the target, so a crash
//! mid-save leaves the previous snapshot intact.

use std::future::Future;
use std::path::{Path, PathBuf};

use whoshome_app::ports::StateStore;
use whoshome_domain::error::WatchError;
use whoshome_domain::state::StateSnapshot;

/// Errors specific to the JSON state store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file exists but could not be read.
    #[error("failed to read state file {path}")]
    Read {
        /// Snapshot location.
        path: PathBuf,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file holds something that is not a snapshot.
    #[error("failed to parse state file {path}")]
    Parse {
        /// Snapshot location.
        path: PathBuf,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to encode state snapshot")]
    Encode(#[source] serde_json::Error),

    /// The new snapshot could not be written or moved into place.
    #[error("failed to write state file {path}")]
    Write {
        /// Snapshot location.
        path: PathBuf,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },
}

impl From<StoreError> for WatchError {
    fn from(err: StoreError) -> Self {
        Self::StateStore(Box::new(err))
    }
}

/// JSON file store for the per-section debounce snapshot.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Create a store backed by `path`. Nothing is touched until the first
    /// load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StateSnapshot, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(StateSnapshot::default())
            }
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn replace(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(snapshot).map_err(StoreError::Encode)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, payload).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> impl Future<Output = Result<StateSnapshot, WatchError>> + Send {
        let result = self.read().map_err(WatchError::from);
        async move { result }
    }

    fn save(
        &self,
        snapshot: &StateSnapshot,
    ) -> impl Future<Output = Result<(), WatchError>> + Send {
        let result = self.replace(snapshot).map_err(WatchError::from);
        async move { result }
    }
}

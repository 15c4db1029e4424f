//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors; adapters convert into
//! [`WatchError`] when crossing a port boundary (boxed, so the domain does
//! not need to know adapter internals).

use std::error::Error as StdError;

/// Top-level error carried across port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A domain invariant or configured value was rejected.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The persisted state store could not be read or written.
    ///
    /// Fatal for the running cycle: evaluation must not continue on an empty
    /// in-memory snapshot that would later overwrite good history.
    #[error("state store error")]
    StateStore(#[source] Box<dyn StdError + Send + Sync>),

    /// The external neighbor listing could not be obtained.
    #[error("neighbor source error")]
    Neighbors(#[source] Box<dyn StdError + Send + Sync>),

    /// A triggered command could not be launched or reaped.
    #[error("command dispatch error")]
    Dispatch(#[source] Box<dyn StdError + Send + Sync>),
}

/// Rejected configuration or domain values.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A filter regex did not compile.
    #[error("invalid {field} pattern")]
    InvalidPattern {
        /// Which criteria field carried the pattern.
        field: &'static str,
        /// The compile failure.
        #[source]
        source: regex::Error,
    },

    /// A section needs at least one sample before it may act.
    #[error("threshold must be at least 1")]
    ZeroThreshold,

    /// Sections are keyed by name; an empty key cannot be persisted.
    #[error("section name must not be empty")]
    EmptyName,

    /// A cron gate expression did not parse.
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron {
        /// The expression as configured.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },
}

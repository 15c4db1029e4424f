//! Shell adapter error types.

use std::process::ExitStatus;

/// Errors specific to subprocess-backed adapters.
///
/// Converted into the matching [`WatchError`](whoshome_domain::error::WatchError)
/// variant at each port boundary — neighbor-listing failures become
/// `Neighbors`, launch and reap failures become `Dispatch`.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The external program could not be started.
    #[error("failed to spawn {command:?}")]
    Spawn {
        /// The command as configured.
        command: String,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The external program started but exited unsuccessfully.
    #[error("{command:?} exited with {status}")]
    Failed {
        /// The command as configured.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },

    /// The process outcome could not be collected.
    #[error("failed to collect output of {command:?}")]
    Wait {
        /// The command as configured.
        command: String,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// A triggered command was empty after whitespace splitting.
    #[error("refusing to launch an empty command")]
    EmptyCommand,
}

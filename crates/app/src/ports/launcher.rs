//! Command launcher port — asynchronous dispatch of triggered commands.

use std::future::Future;

use whoshome_domain::error::WatchError;

/// Handle on a dispatched command, reaped after all sections have been
/// evaluated.
pub trait DispatchHandle {
    /// Wait for the command to finish and return its captured stderr.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Dispatch`] when the process outcome cannot be
    /// collected.
    fn wait(self) -> impl Future<Output = Result<String, WatchError>> + Send;
}

/// Launches a command without blocking the engine's per-section loop.
pub trait CommandLauncher {
    /// Handle type returned by [`launch`](Self::launch).
    type Handle: DispatchHandle + Send;

    /// Start `command` asynchronously and return a handle for later reaping.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Dispatch`] when the process cannot be spawned.
    fn launch(&self, command: &str) -> Result<Self::Handle, WatchError>;
}

//! Command launcher backed by `tokio::process`.
//!
//! Triggered commands are whitespace-split into an argv, spawned with piped
//! stdout/stderr, and left running while the engine finishes its section
//! loop. Reaping collects stderr for the rollback decision.

use std::future::Future;
use std::process::Stdio;

use tokio::process::{Child, Command};

use whoshome_app::ports::{CommandLauncher, DispatchHandle};
use whoshome_domain::error::WatchError;

use crate::error::ShellError;

/// Spawns triggered commands without blocking the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Create a new launcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// A running command, reaped after section evaluation.
#[derive(Debug)]
pub struct ProcessHandle {
    command: String,
    child: Child,
}

impl CommandLauncher for ProcessLauncher {
    type Handle = ProcessHandle;

    fn launch(&self, command: &str) -> Result<ProcessHandle, WatchError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| WatchError::Dispatch(Box::new(ShellError::EmptyCommand)))?;
        let child = Command::new(program)
            .args(parts)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                WatchError::Dispatch(Box::new(ShellError::Spawn {
                    command: command.to_owned(),
                    source,
                }))
            })?;
        Ok(ProcessHandle {
            command: command.to_owned(),
            child,
        })
    }
}

impl DispatchHandle for ProcessHandle {
    fn wait(self) -> impl Future<Output = Result<String, WatchError>> + Send {
        async move {
            let Self { command, child } = self;
            let output = child.wait_with_output().await.map_err(|source| {
                WatchError::Dispatch(Box::new(ShellError::Wait {
                    command: command.clone(),
                    source,
                }))
            })?;
            if !output.stdout.is_empty() {
                tracing::debug!(
                    command = %command,
                    stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
                    "command output"
                );
            }
            Ok(String::from_utf8_lossy(&output.stderr).into_owned())
        }
    }
}

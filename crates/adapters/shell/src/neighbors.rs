//! Neighbor source backed by `ip neigh show`.

use std::future::Future;

use tokio::process::Command;

use whoshome_app::ports::NeighborSource;
use whoshome_domain::error::WatchError;
use whoshome_domain::neighbor::NeighborRecord;

use crate::error::ShellError;

/// Lists the kernel neighbor table by running `ip neigh show`, optionally
/// restricted with `dev <device>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpNeighSource;

impl IpNeighSource {
    /// Create a new source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NeighborSource for IpNeighSource {
    fn list_neighbors(
        &self,
        device: Option<&str>,
    ) -> impl Future<Output = Result<Vec<NeighborRecord>, WatchError>> + Send {
        let mut command = Command::new("ip");
        command.arg("neigh").arg("show");
        let mut label = String::from("ip neigh show");
        if let Some(device) = device {
            command.args(["dev", device]);
            label.push_str(" dev ");
            label.push_str(device);
        }
        async move {
            let output = command.output().await.map_err(|source| {
                WatchError::Neighbors(Box::new(ShellError::Spawn {
                    command: label.clone(),
                    source,
                }))
            })?;
            if !output.status.success() {
                return Err(WatchError::Neighbors(Box::new(ShellError::Failed {
                    command: label,
                    status: output.status,
                })));
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(parse_table(&stdout))
        }
    }
}

fn parse_table(stdout: &str) -> Vec<NeighborRecord> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(NeighborRecord::parse)
        .collect()
}

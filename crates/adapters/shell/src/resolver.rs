//! Reverse name resolution via `nslookup`, diagnostics only.

use std::future::Future;

use tokio::process::Command;

use whoshome_app::ports::NameResolver;

/// Best-effort reverse resolver. Every failure — missing binary, non-zero
/// exit, unparsable output — maps to `None` and is logged at debug level at
/// most; resolution never affects classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NslookupResolver;

impl NslookupResolver {
    /// Create a new resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NameResolver for NslookupResolver {
    fn resolve(&self, address: &str) -> impl Future<Output = Option<String>> + Send {
        let mut command = Command::new("nslookup");
        command.arg(address);
        let address = address.to_owned();
        async move {
            let output = match command.output().await {
                Ok(output) => output,
                Err(err) => {
                    tracing::debug!(%address, error = %err, "nslookup unavailable");
                    return None;
                }
            };
            if !output.status.success() {
                tracing::debug!(%address, status = %output.status, "nslookup failed");
                return None;
            }
            parse_answer(&String::from_utf8_lossy(&output.stdout))
        }
    }
}

/// Pull the first `name = <host>` answer out of nslookup output.
fn parse_answer(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.split_once("name = "))
        .map(|(_, name)| name.trim().trim_end_matches('.').to_owned())
        .filter(|name| !name.is_empty())
}

//! # whoshome-adapter-shell
//!
//! Subprocess-backed implementations of the whoshome ports:
//!
//! - [`IpNeighSource`] — lists the kernel neighbor table via `ip neigh show`
//! - [`NslookupResolver`] — best-effort reverse name lookup via `nslookup`
//! - [`ProcessLauncher`] — launches triggered commands with piped output
//!
//! All three shell out; none of them blocks the engine's section loop beyond
//! the external command itself.

mod error;
mod launcher;
mod neighbors;
mod resolver;

pub use error::ShellError;
pub use launcher::{ProcessHandle, ProcessLauncher};
pub use neighbors::IpNeighSource;
pub use resolver::NslookupResolver;

#![deny(unused)]
//! Supervisor for an embedded `sandboxaid` server.
//!
//! The server is launched on demand as a child process bound to a free
//! localhost port. It announces its address with a single JSON line on stdout;
//! everything it writes afterwards is forwarded to `tracing` under the
//! `sandboxai::server` target. One server is shared per host process and is
//! shut down when the process exits.

pub mod output;
pub mod process;
pub mod server;

pub use server::EmbeddedServer;

use sandboxai_core::{config::EmbeddedConfig, Result};

/// Start the shared embedded server if needed and return its base URL.
pub fn start(config: &EmbeddedConfig) -> Result<String> {
    EmbeddedServer::global().start(config)
}

/// Stop the shared embedded server. No-op when it is not running.
pub fn stop() -> Result<()> {
    EmbeddedServer::global().stop()
}

/// Whether the shared embedded server is running.
pub fn is_running() -> bool {
    EmbeddedServer::global().is_running()
}

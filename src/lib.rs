#![deny(unused)]
//! SandboxAI: run code in remote sandboxes.
//!
//! A [`Sandbox`] is a handle to one remote sandbox. It talks to a sandbox
//! service over HTTP, either at an address you supply or on an embedded
//! `sandboxaid` server that is started on first use and shut down when the
//! process exits.
//!
//! ```ignore
//! use sandboxai::Sandbox;
//!
//! Sandbox::builder().embedded(true).build()?.scope(|sb| {
//!     let result = sb.run_ipython_cell("print(123)")?;
//!     println!("{}", result.text().unwrap_or_default());
//!     Ok(())
//! })?;
//! ```

pub mod telemetry;

pub use sandboxai_client::HttpClient;
pub use sandboxai_core::{
    config::{ClientConfig, EmbeddedConfig, SandboxaiConfig},
    traits::{SandboxApi, Tool},
    types::{
        IPythonCellResult, Sandbox as SandboxInfo, SandboxSpec, ShellCommandResult, ToolOutput,
    },
    Error, Result, DEFAULT_IMAGE, DEFAULT_SPACE,
};
pub use sandboxai_embedded::EmbeddedServer;
pub use sandboxai_sandbox::{
    share, RunIPythonCellTool, RunShellCommandTool, Sandbox, SandboxBuilder, ScopedSandbox,
    SharedSandbox,
};
pub use telemetry::configure_tracing;

/// Wire types of the v1 API.
pub mod types {
    pub use sandboxai_core::types::*;
}

/// Embedded server control.
pub mod embedded {
    pub use sandboxai_embedded::{is_running, start, stop, EmbeddedServer};
}

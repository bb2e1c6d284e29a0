#![deny(unused)]
//! Sandbox handles for SandboxAI.
//!
//! A [`Sandbox`] stands for one remote sandbox. It talks to the service
//! through a [`SandboxApi`](sandboxai_core::traits::SandboxApi) client, which
//! is either built from an explicit base URL or pointed at the process-wide
//! embedded server.
//!
//! ```text
//! Sandbox::builder()
//!     │ base_url / embedded(true)
//!     ▼
//! SandboxBuilder::build ──► EmbeddedServer::start (embedded mode, once per process)
//!     │
//!     ▼
//! HttpClient ──► POST /spaces/{space}/sandboxes (unless lazy)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sandboxai_sandbox::Sandbox;
//!
//! let sandbox = Sandbox::builder().embedded(true).build()?;
//! sandbox.scope(|sb| {
//!     let result = sb.run_shell_command("echo hi")?;
//!     println!("{}", result.text().unwrap_or_default());
//!     Ok(())
//! })?;
//! ```

pub mod handle;
pub mod scope;
pub mod tools;

pub use handle::{Sandbox, SandboxBuilder};
pub use scope::ScopedSandbox;
pub use tools::{share, RunIPythonCellTool, RunShellCommandTool, SharedSandbox};

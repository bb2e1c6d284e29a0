//! Core traits for SandboxAI.
//!
//! - `sandbox`: the [`SandboxApi`] seam between the sandbox handle and the
//!   service it talks to (HTTP in production, in-memory in tests).
//! - `tool`: the [`Tool`] interface agent adapters implement.

pub mod sandbox;
pub mod tool;

pub use sandbox::*;
pub use tool::*;

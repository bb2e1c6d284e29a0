#![deny(unused)]
//! In-process fake of the SandboxAI v1 service.
//!
//! [`MockSandboxServer`] serves the sandbox management and tool invocation
//! routes from an in-memory store. Shell commands run through the local `sh`
//! (no isolation whatsoever) and IPython cells are answered by an echo kernel,
//! which is enough to exercise clients end to end. The `mock-sandboxaid`
//! binary wraps it in the embedded-mode process contract: port selection and
//! scope from the environment, a JSON handshake line on stdout, logs on
//! stderr, and optional cleanup on SIGTERM.

pub mod kernel;
pub mod server;

pub use server::{MockSandboxServer, MockState, RunningMockServer};

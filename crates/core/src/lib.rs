#![deny(unused)]
//! Core types, traits, and error definitions for SandboxAI.
//!
//! This crate provides the building blocks shared by the protocol client, the
//! embedded server supervisor, and the sandbox handle: the v1 wire types, the
//! [`SandboxApi`](traits::SandboxApi) seam, configuration loading, and the
//! crate-wide [`Error`].

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{SandboxApi, Tool, HEALTH_POLL_INTERVAL};
pub use types::*;

/// Space used when the caller does not pick one.
pub const DEFAULT_SPACE: &str = "default";

/// Box image used when the caller does not pick one.
pub const DEFAULT_IMAGE: &str = "substratusai/sandboxai-box:v0.2.0";

#![deny(unused)]
//! HTTP client for the SandboxAI v1 API.
//!
//! [`HttpClient`] translates sandbox lifecycle and tool invocation calls into
//! JSON requests, checks every response against the status the contract
//! documents for it, and decodes typed bodies. It keeps no state beyond the
//! base URL and a reusable connection pool.
//!
//! # Usage
//!
//! ```ignore
//! use sandboxai_client::HttpClient;
//! use sandboxai_core::{CreateSandboxRequest, SandboxApi, SandboxSpec};
//!
//! let client = HttpClient::new("http://localhost:5266/v1")?;
//! client.wait_until_healthy(std::time::Duration::from_secs(10))?;
//! let sandbox = client.create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img:v1")))?;
//! client.delete_sandbox("default", &sandbox.name)?;
//! ```

pub mod http;

pub use http::HttpClient;

//! v1 wire types and the typed results built from them.
//!
//! `sandbox` covers sandbox management bodies, `tool` covers the tool
//! invocation bodies and their split/combined output shapes, and `server`
//! covers the health payload, error body, and embedded handshake.

pub mod sandbox;
pub mod server;
pub mod tool;

pub use sandbox::*;
pub use server::*;
pub use tool::*;

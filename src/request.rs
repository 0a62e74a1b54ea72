//! Caller-facing request and response shapes plus the authorization request builder.
//!
//! `parameters` holds what callers pass in, `response` what the orchestrator hands back,
//! and `server` the wire-facing authorization request and token endpoint payloads.

pub mod parameters;
pub mod response;
pub mod server;

pub use parameters::*;
pub use response::*;
pub use server::*;

//! safeplayd service internals
//!
//! The daemon logic lives here so integration tests can run a full service
//! against a scripted host and a real control socket; `main.rs` only parses
//! arguments and wires the Linux host in.

mod service;

pub use service::*;

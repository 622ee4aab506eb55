//! Shared utilities for safeplayd
//!
//! This crate provides:
//! - ID types (GameId, ClientId)
//! - Time utilities (monotonic time, duration helpers)
//! - Rate limiting helpers
//! - Default paths for the control socket

mod ids;
mod paths;
mod rate_limit;
mod time;

pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;

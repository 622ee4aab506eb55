//! Protocol types for the safeplayd IPC surface
//!
//! Shared between the daemon and its UI/overlay clients:
//! - Commands (block, set limit, unblock, monitoring gate, state queries)
//! - Events (session list updates, lifecycle transitions, overlay payloads)
//! - Common view types

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Protocol version; bumped on incompatible changes
pub const API_VERSION: u32 = 1;

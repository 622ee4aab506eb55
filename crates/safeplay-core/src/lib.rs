//! Core enforcement engine for safeplayd
//!
//! Coordinates the session registry, the per-game warn/kill timer pairs,
//! the adaptive poll cadence, and notification deduplication. All state is
//! owned by a single [`Engine`] instance; the daemon drives it from one
//! event loop and applies host termination results back into it.

mod engine;
mod events;
mod notify;
mod poller;
mod registry;
mod timers;

pub use engine::*;
pub use events::*;
pub use notify::*;
pub use poller::*;
pub use registry::*;
pub use timers::*;

//! Host interface traits for safeplayd
//!
//! The engine never talks to the OS process table directly. It consumes two
//! narrow async operations - enumerate candidate game processes, terminate
//! the processes behind one identity - injected at daemon startup. Tests
//! inject [`MockProcessHost`] to script snapshots and outcomes.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;

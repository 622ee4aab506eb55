//! Linux host adapter for safeplayd
//!
//! Enumerates game processes by walking /proc and matching executable paths
//! against game-library markers, and terminates them with SIGTERM.

mod host;
mod scan;

pub use host::*;
pub use scan::*;

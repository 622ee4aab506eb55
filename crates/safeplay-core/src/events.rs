//! Events emitted by one engine tick
//!
//! The daemon translates these into IPC broadcasts and host actions. The
//! engine itself never touches the socket or the process table.

use chrono::{DateTime, Local};
use safeplay_util::GameId;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A new session appeared and a start notification is due
    Started {
        game: GameId,
        started_at: DateTime<Local>,
    },
    /// A session appeared but its start notification was suppressed
    StartedSilently { game: GameId },
    /// A session left the registry
    Closed {
        game: GameId,
        enforced: bool,
        duration: Duration,
    },
    /// The warning lead was reached for a limited game
    WarningDue { game: GameId, remaining: Duration },
    /// A limit elapsed; the daemon should attempt termination
    EnforceDue { game: GameId },
    /// A play limit was armed
    LimitSet { game: GameId, minutes: u64 },
    /// A block was lifted
    Unblocked { game: GameId },
}

//! Event types for safeplayd -> client streaming

use chrono::{DateTime, Local};
use safeplay_util::GameId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CloseReason, EnforcementResult, OverlayEvent, SessionView, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: safeplay_util::now(),
            payload,
        }
    }
}

/// All possible events from the daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full registry snapshot, sent after every reconciliation pass
    SessionListUpdated { sessions: Vec<SessionView> },

    /// A game appeared in the process snapshot
    GameStarted {
        game: GameId,
        started_at: DateTime<Local>,
    },

    /// A tracked game left the registry
    GameClosed {
        game: GameId,
        reason: CloseReason,
        /// Time from the most recent appearance to removal
        duration: Duration,
    },

    /// A playtime limit was armed
    LimitSet { game: GameId, minutes: u64 },

    /// A kill timer fired (termination requested)
    TimeExpired { game: GameId },

    /// A block was lifted
    Unblocked { game: GameId },

    /// Outcome of a termination request
    EnforcementResult(EnforcementResult),

    /// Notification for the overlay surface
    Overlay(OverlayEvent),

    /// The poll gate was opened or closed
    MonitoringChanged { active: bool },

    /// Service is shutting down
    Shutdown,
}

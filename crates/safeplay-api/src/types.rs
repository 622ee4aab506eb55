//! Shared types for the safeplayd API

use chrono::{DateTime, Local};
use safeplay_util::GameId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tracking status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Seen in the most recent process snapshot
    Running,
    /// Missing from the latest snapshot; removed if it stays gone past the
    /// close grace window
    PendingClose,
}

/// View of a tracked session for UI display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub game: GameId,
    pub display_name: String,
    pub started_at: DateTime<Local>,
    pub status: SessionStatus,
}

/// Why a session left the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The user (or the game itself) closed the process
    User,
    /// The daemon terminated the process for a limit or block
    Enforcement,
}

/// Overlay notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayVariant {
    Info,
    Success,
    Warn,
    Error,
}

/// Payload for the always-on-top overlay collaborator.
///
/// `countdown` asks the overlay to render a live countdown bar alongside the
/// message (used for the pre-termination warning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayEvent {
    pub variant: OverlayVariant,
    pub title: String,
    pub body: String,
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<Duration>,
}

impl OverlayEvent {
    pub fn new(
        variant: OverlayVariant,
        title: impl Into<String>,
        body: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            variant,
            title: title.into(),
            body: body.into(),
            duration,
            countdown: None,
        }
    }

    pub fn with_countdown(mut self, countdown: Duration) -> Self {
        self.countdown = Some(countdown);
        self
    }
}

/// Outcome of a termination request, surfaced to supervisor UIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementResult {
    pub game: GameId,
    pub success: bool,
    pub message: String,
}

/// Full daemon state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub api_version: u32,
    /// Whether the poll gate is open (snapshots are being taken)
    pub monitoring_active: bool,
    pub sessions: Vec<SessionView>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Supervisor UI - can block, set limits, unblock, toggle monitoring
    Supervisor,
    /// Overlay surface - view state and subscribe to events only
    Overlay,
}

impl ClientRole {
    pub fn can_enforce(&self) -> bool {
        matches!(self, ClientRole::Supervisor)
    }

    pub fn can_toggle_monitoring(&self) -> bool {
        matches!(self, ClientRole::Supervisor)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub monitoring_active: bool,
    pub tracked_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_event_serialization() {
        let event = OverlayEvent::new(
            OverlayVariant::Warn,
            "Closing soon",
            "Celeste will close in 30 seconds",
            Duration::from_secs(30),
        )
        .with_countdown(Duration::from_secs(30));

        let json = serde_json::to_string(&event).unwrap();
        let parsed: OverlayEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event, parsed);
        assert!(json.contains("warn"));
    }

    #[test]
    fn countdown_omitted_when_absent() {
        let event = OverlayEvent::new(
            OverlayVariant::Info,
            "Limit set",
            "30 min for Celeste",
            Duration::from_secs(4),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("countdown"));
    }

    #[test]
    fn roles() {
        assert!(ClientRole::Supervisor.can_enforce());
        assert!(!ClientRole::Overlay.can_enforce());
        assert!(!ClientRole::Overlay.can_toggle_monitoring());
    }
}

//! Configuration schema

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Raw TOML shape, converted to [`Settings`] after the version check
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub config_version: u32,

    #[serde(default)]
    pub service: RawService,

    #[serde(default)]
    pub monitor: RawMonitor,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawService {
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawMonitor {
    pub base_poll_ms: Option<u64>,
    pub burst_poll_ms: Option<u64>,
    pub burst_window_ms: Option<u64>,
    pub warn_lead_secs: Option<u64>,
    pub kill_grace_secs: Option<u64>,
    pub start_cooldown_secs: Option<u64>,
    pub close_grace_ms: Option<u64>,
    pub notify_debounce_ms: Option<u64>,
    pub library_markers: Option<Vec<String>>,
}

/// Validated service settings
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub socket_path: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            socket_path: safeplay_util::socket_path_without_env(),
        }
    }
}

/// Validated monitor tunables.
///
/// Defaults match the reference behavior: 1s base polls with 500ms bursts
/// for 5s after a state change, a 30s warning lead before a kill, and a 10s
/// grace window for classifying a disappearance as an enforcement close.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Steady-state snapshot cadence
    pub base_poll: Duration,
    /// Accelerated cadence while a burst window is open
    pub burst_poll: Duration,
    /// How long one state change keeps the burst cadence alive
    pub burst_window: Duration,
    /// Warning notification lead before a kill timer fires
    pub warn_lead: Duration,
    /// How long a kill marker classifies a disappearance as enforced
    pub kill_grace: Duration,
    /// Window suppressing duplicate "game started" notifications
    pub start_cooldown: Duration,
    /// How long an identity must stay missing before its session closes
    pub close_grace: Duration,
    /// Identical-notification suppression window
    pub notify_debounce: Duration,
    /// Path fragments identifying game-library installs
    pub library_markers: Vec<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            base_poll: Duration::from_millis(1000),
            burst_poll: Duration::from_millis(500),
            burst_window: Duration::from_secs(5),
            warn_lead: Duration::from_secs(30),
            kill_grace: Duration::from_secs(10),
            start_cooldown: Duration::from_secs(60),
            close_grace: Duration::from_millis(1500),
            notify_debounce: Duration::from_secs(1),
            library_markers: vec!["steamapps/common".to_string()],
        }
    }
}

impl MonitorSettings {
    /// Kill markers are pruned after three grace windows
    pub fn kill_marker_retention(&self) -> Duration {
        self.kill_grace * 3
    }
}

/// Full validated settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub service: ServiceSettings,
    pub monitor: MonitorSettings,
}

impl Settings {
    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = MonitorSettings::default();
        let m = raw.monitor;

        let monitor = MonitorSettings {
            base_poll: m
                .base_poll_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_poll),
            burst_poll: m
                .burst_poll_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.burst_poll),
            burst_window: m
                .burst_window_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.burst_window),
            warn_lead: m
                .warn_lead_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.warn_lead),
            kill_grace: m
                .kill_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.kill_grace),
            start_cooldown: m
                .start_cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.start_cooldown),
            close_grace: m
                .close_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.close_grace),
            notify_debounce: m
                .notify_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.notify_debounce),
            library_markers: m.library_markers.unwrap_or(defaults.library_markers),
        };

        let service = ServiceSettings {
            socket_path: raw
                .service
                .socket_path
                .unwrap_or_else(safeplay_util::socket_path_without_env),
        };

        Self { service, monitor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let m = MonitorSettings::default();
        assert!(m.burst_poll < m.base_poll);
        assert!(m.start_cooldown > m.kill_grace);
        assert_eq!(m.kill_marker_retention(), m.kill_grace * 3);
    }
}

//! Settings validation

use crate::Settings;
use std::time::Duration;

/// A single validation failure, with the offending field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate settings, returning all problems found
pub fn validate_settings(settings: &Settings) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let m = &settings.monitor;

    if m.base_poll < Duration::from_millis(100) {
        errors.push(ValidationError::new(
            "monitor.base_poll_ms",
            "base poll interval must be at least 100ms",
        ));
    }

    if m.burst_poll >= m.base_poll {
        errors.push(ValidationError::new(
            "monitor.burst_poll_ms",
            "burst cadence must be faster than the base cadence",
        ));
    }

    if m.burst_window < m.base_poll {
        errors.push(ValidationError::new(
            "monitor.burst_window_ms",
            "burst window shorter than one base poll has no effect",
        ));
    }

    if m.warn_lead.is_zero() {
        errors.push(ValidationError::new(
            "monitor.warn_lead_secs",
            "warning lead must be non-zero",
        ));
    }

    if m.start_cooldown <= m.kill_grace {
        errors.push(ValidationError::new(
            "monitor.start_cooldown_secs",
            "start cooldown must be longer than the kill grace window",
        ));
    }

    if m.library_markers.is_empty() {
        errors.push(ValidationError::new(
            "monitor.library_markers",
            "at least one library marker is required",
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MonitorSettings, ServiceSettings};

    #[test]
    fn default_settings_validate() {
        let settings = Settings::default();
        assert!(validate_settings(&settings).is_empty());
    }

    #[test]
    fn multiple_errors_reported() {
        let settings = Settings {
            service: ServiceSettings::default(),
            monitor: MonitorSettings {
                burst_poll: Duration::from_secs(5),
                warn_lead: Duration::ZERO,
                library_markers: vec![],
                ..MonitorSettings::default()
            },
        };

        let errors = validate_settings(&settings);
        assert!(errors.len() >= 3);
        assert!(errors.iter().any(|e| e.field == "monitor.warn_lead_secs"));
    }
}

//! Configuration parsing and validation for safeplayd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Service settings (socket path)
//! - Monitor tunables (poll cadences, burst window, grace windows)
//! - Validation with clear error messages

mod schema;
mod validation;

pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Settings> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let settings = Settings::from_raw(raw);

    let errors = validate_settings(&settings);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(settings)
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = "config_version = 1";

        let settings = parse_config(config).unwrap();
        assert_eq!(settings.monitor.base_poll, Duration::from_millis(1000));
        assert_eq!(settings.monitor.warn_lead, Duration::from_secs(30));
    }

    #[test]
    fn parse_monitor_overrides() {
        let config = r#"
            config_version = 1

            [monitor]
            base_poll_ms = 2000
            burst_poll_ms = 400
            burst_window_ms = 4000
            library_markers = ["steamapps/common", "GOG Games"]
        "#;

        let settings = parse_config(config).unwrap();
        assert_eq!(settings.monitor.base_poll, Duration::from_millis(2000));
        assert_eq!(settings.monitor.burst_poll, Duration::from_millis(400));
        assert_eq!(settings.monitor.burst_window, Duration::from_millis(4000));
        assert_eq!(settings.monitor.library_markers.len(), 2);
    }

    #[test]
    fn reject_wrong_version() {
        let config = "config_version = 99";

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_cadence() {
        // Burst cadence must be faster than base cadence
        let config = r#"
            config_version = 1

            [monitor]
            base_poll_ms = 500
            burst_poll_ms = 1000
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }
}

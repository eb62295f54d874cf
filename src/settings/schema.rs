//! Settings schema for the Reflow backend.
//!
//! All settings structs use `#[serde(default)]` so a partial configuration
//! file is valid; missing fields fall back to sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Floor for the autosave interval. Anything lower would thrash the disk for
/// no durability benefit.
pub const MIN_AUTOSAVE_INTERVAL_SECS: u64 = 5;

/// Root settings structure for the Reflow backend.
///
/// Loaded from `reflow.toml` with `REFLOW_*` environment variable overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowSettings {
    /// Directory holding session metadata and page images
    pub data_dir: PathBuf,

    /// Seconds between dirty-session flushes (floored at 5)
    pub autosave_interval_secs: u64,

    /// Seconds the event stream waits for a message before synthesizing
    /// a heartbeat frame
    pub heartbeat_secs: u64,

    /// HTTP listen port (0 picks a random free port)
    pub port: u16,

    /// Default log filter, e.g. "info" or "reflow=debug"
    pub log_level: String,
}

impl Default for ReflowSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_interval_secs: 30,
            heartbeat_secs: 15,
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

impl ReflowSettings {
    /// Autosave interval with the floor applied.
    pub fn autosave_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.autosave_interval_secs.max(MIN_AUTOSAVE_INTERVAL_SECS))
    }

    /// Heartbeat timeout for event streams.
    pub fn heartbeat(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_secs)
    }
}

/// Platform-specific default directory for persistent artifacts.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reflow")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = ReflowSettings::default();
        assert_eq!(settings.autosave_interval_secs, 30);
        assert_eq!(settings.heartbeat_secs, 15);
        assert_eq!(settings.port, 8000);
        assert!(settings.data_dir.ends_with("reflow"));
    }

    #[test]
    fn autosave_interval_enforces_floor() {
        let settings = ReflowSettings {
            autosave_interval_secs: 1,
            ..Default::default()
        };
        assert_eq!(
            settings.autosave_interval(),
            std::time::Duration::from_secs(MIN_AUTOSAVE_INTERVAL_SECS)
        );
    }

    #[test]
    fn deserializes_partial_toml() {
        let settings: ReflowSettings = toml::from_str("port = 9100").unwrap();
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.autosave_interval_secs, 30);
    }
}

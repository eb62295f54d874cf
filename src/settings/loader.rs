//! Settings loading and environment overrides.
//!
//! Settings come from an optional TOML file, then `REFLOW_*` environment
//! variables override individual fields. The loader never fails on a missing
//! file; it fails only on a present-but-malformed one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::schema::ReflowSettings;

/// Default path of the configuration file, next to the working directory.
pub fn settings_path() -> PathBuf {
    PathBuf::from("reflow.toml")
}

/// Load settings from `path` (defaults when absent), then apply `REFLOW_*`
/// environment overrides.
pub fn load(path: &Path) -> Result<ReflowSettings> {
    let mut settings = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let parsed: ReflowSettings =
            toml::from_str(&contents).context("Failed to deserialize settings")?;
        tracing::info!("Loaded settings from {}", path.display());
        parsed
    } else {
        tracing::debug!("Settings file not found at {}, using defaults", path.display());
        ReflowSettings::default()
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut ReflowSettings) {
    if let Ok(dir) = std::env::var("REFLOW_DATA_DIR") {
        settings.data_dir = PathBuf::from(dir);
    }
    if let Some(secs) = env_parse("REFLOW_AUTOSAVE_INTERVAL_SECS") {
        settings.autosave_interval_secs = secs;
    }
    if let Some(secs) = env_parse("REFLOW_HEARTBEAT_SECS") {
        settings.heartbeat_secs = secs;
    }
    if let Some(port) = env_parse("REFLOW_PORT") {
        settings.port = port;
    }
    if let Ok(level) = std::env::var("REFLOW_LOG_LEVEL") {
        settings.log_level = level;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(value) => match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}", key, value);
                None
            }
        },
        Err(_) => None,
    }
}

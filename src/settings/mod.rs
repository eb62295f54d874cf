//! TOML-based configuration for the Reflow backend.
//!
//! Settings are loaded once at startup from `reflow.toml` (if present) and
//! overridden by `REFLOW_*` environment variables, then passed by reference
//! into the components that need them.

pub mod loader;
pub mod schema;

pub use loader::{load, settings_path};
pub use schema::{default_data_dir, ReflowSettings, MIN_AUTOSAVE_INTERVAL_SECS};

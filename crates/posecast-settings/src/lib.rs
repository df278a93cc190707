//! # posecast-settings
//!
//! Configuration management with layered sources for the posecast relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PosecastSettings::default()`]
//! 2. **Settings file**: `~/.posecast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `POSECAST_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, load_with_env,
    settings_path,
};
pub use types::{LoggingSettings, PosecastSettings, ServerSettings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = PosecastSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_match_relay_defaults() {
        let settings = PosecastSettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8765);
        assert_eq!(settings.server.max_message_size, 1 << 20);
        assert_eq!(settings.server.heartbeat_interval_secs, 30);
        assert_eq!(settings.logging.level, "info");
    }
}

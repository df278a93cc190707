//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PosecastSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use posecast_core::logging::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::PosecastSettings;

/// Resolve the path to the settings file (`~/.posecast/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".posecast").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PosecastSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PosecastSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings reading environment values through `env`.
pub fn load_with_env<F>(path: &Path, env: F) -> Result<PosecastSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(PosecastSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PosecastSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `env`.
///
/// `POSECAST_HOST` / `POSECAST_PORT` fall back to plain `HOST` / `PORT`.
/// Invalid values are ignored with a warning.
pub fn apply_env_overrides<F>(settings: &mut PosecastSettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let reader = EnvReader { env: &env };

    if let Some(v) = reader
        .string("POSECAST_HOST")
        .or_else(|| reader.string("HOST"))
    {
        settings.server.host = v;
    }
    if let Some(v) = reader
        .u64_range("POSECAST_PORT", 0, 65535)
        .or_else(|| reader.u64_range("PORT", 0, 65535))
        .and_then(|v| u16::try_from(v).ok())
    {
        settings.server.port = v;
    }
    if let Some(v) = reader.u64_range("POSECAST_MAX_MESSAGE_SIZE", 1024, 64 * 1024 * 1024) {
        settings.server.max_message_size = usize::try_from(v).unwrap_or(usize::MAX);
    }
    if let Some(v) = reader.u64_range("POSECAST_HEARTBEAT_INTERVAL_SECS", 1, 3600) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = reader.u64_range("POSECAST_HEARTBEAT_TIMEOUT_SECS", 1, 86_400) {
        settings.server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = reader.string("POSECAST_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(raw) = reader.string("POSECAST_LOG_FORMAT") {
        match LogFormat::parse(&raw) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "POSECAST_LOG_FORMAT", value = %raw, "invalid log format env var, ignoring"),
        }
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<'a, F> {
    env: &'a F,
}

impl<F> EnvReader<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|v| !v.is_empty())
    }

    fn u64_range(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    }
}

//! Settings schema.

use posecast_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PosecastSettings {
    /// Network and relay settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl PosecastSettings {
    /// Reject combinations the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.server;
        if s.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeatIntervalSecs must be at least 1".into(),
            ));
        }
        if s.heartbeat_timeout_secs < s.heartbeat_interval_secs {
            return Err(SettingsError::InvalidValue(format!(
                "heartbeatTimeoutSecs ({}) is shorter than heartbeatIntervalSecs ({})",
                s.heartbeat_timeout_secs, s.heartbeat_interval_secs
            )));
        }
        if s.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "sendQueueCapacity must be at least 1".into(),
            ));
        }
        if s.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "maxMessageSize must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Relay network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// Seconds between server pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence after which a connection is closed.
    pub heartbeat_timeout_secs: u64,
    /// Outbound messages buffered per connection.
    pub send_queue_capacity: usize,
    /// How long one delivery may wait for queue space, in milliseconds.
    pub delivery_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            max_message_size: 1 << 20,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            send_queue_capacity: 256,
            delivery_timeout_ms: 5_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PosecastSettings::default().validate().unwrap();
    }

    #[test]
    fn camel_case_keys() {
        let value = serde_json::to_value(PosecastSettings::default()).unwrap();
        assert_eq!(value["server"]["maxMessageSize"], 1 << 20);
        assert_eq!(value["server"]["heartbeatIntervalSecs"], 30);
        assert_eq!(value["logging"]["format"], "compact");
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings: PosecastSettings =
            serde_json::from_str(r#"{"server":{"port":9000}}"#).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn zero_heartbeat_interval_is_invalid() {
        let mut settings = PosecastSettings::default();
        settings.server.heartbeat_interval_secs = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn timeout_shorter_than_interval_is_invalid() {
        let mut settings = PosecastSettings::default();
        settings.server.heartbeat_interval_secs = 60;
        settings.server.heartbeat_timeout_secs = 30;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("shorter than"));
    }

    #[test]
    fn zero_queue_is_invalid() {
        let mut settings = PosecastSettings::default();
        settings.server.send_queue_capacity = 0;
        assert!(settings.validate().is_err());
    }
}

//! Pose sample types.

use serde::{Deserialize, Serialize};

/// Raw `ts` values above this are epoch milliseconds rather than seconds.
pub const MILLIS_EPOCH_THRESHOLD: f64 = 1e12;

/// Client id used when a producer does not supply one.
pub const UNKNOWN_CLIENT_ID: &str = "unknown";

/// Normalize a producer timestamp to epoch seconds.
///
/// Values above [`MILLIS_EPOCH_THRESHOLD`] are treated as epoch milliseconds.
pub fn normalize_timestamp(raw: f64) -> f64 {
    if raw > MILLIS_EPOCH_THRESHOLD {
        raw / 1000.0
    } else {
        raw
    }
}

/// A point in space, in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise `self - other`.
    pub fn displacement_from(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Euclidean length when read as a vector.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Orientation quaternion as reported by the producer.
///
/// Not normalized; values pass through exactly as received.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W (scalar) component.
    pub w: f64,
}

impl Rotation {
    /// Create a rotation.
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One producer's reported state at an instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseSample {
    /// Opaque producer identifier.
    pub client_id: String,
    /// Epoch seconds.
    #[serde(rename = "ts")]
    pub timestamp: f64,
    /// Reported position.
    pub position: Position,
    /// Reported orientation.
    pub rotation: Rotation,
}

impl PoseSample {
    /// Create a sample.
    pub fn new(
        client_id: impl Into<String>,
        timestamp: f64,
        position: Position,
        rotation: Rotation,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            timestamp,
            position,
            rotation,
        }
    }
}

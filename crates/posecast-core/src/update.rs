//! Outbound broadcast record.

use serde::{Deserialize, Serialize};

use crate::pose::PoseSample;
use crate::velocity::VelocityEstimate;

/// A pose sample plus its derived velocity, as broadcast to every connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichedUpdate {
    /// The accepted sample.
    #[serde(flatten)]
    pub sample: PoseSample,
    /// Present only when a rate could be derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<VelocityEstimate>,
}

impl EnrichedUpdate {
    /// Build an update from a sample and an optional velocity.
    pub fn new(sample: PoseSample, velocity: Option<VelocityEstimate>) -> Self {
        Self { sample, velocity }
    }

    /// Human-readable (two-space indented) JSON, the broadcast wire format.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::parse::parse_pose;
    use crate::pose::{Position, Rotation};

    fn sample() -> PoseSample {
        PoseSample::new(
            "headset-7",
            1_712_345_678.123_456,
            Position::new(0.1, 1.62, -0.333_333_333_333_333_3),
            Rotation::new(0.012, -0.707, 0.0, 0.707_106_781_186_547_6),
        )
    }

    #[test]
    fn velocity_omitted_when_absent() {
        let json = EnrichedUpdate::new(sample(), None).to_pretty_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("velocity").is_none());
        assert_eq!(value["clientId"], "headset-7");
    }

    #[test]
    fn velocity_fields_on_the_wire() {
        let velocity = VelocityEstimate {
            vx: 1.0,
            vy: 0.0,
            vz: -2.0,
            speed_m_s: 5f64.sqrt(),
            dt: 0.5,
        };
        let json = EnrichedUpdate::new(sample(), Some(velocity))
            .to_pretty_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let v = &value["velocity"];
        assert_eq!(v["vx"], 1.0);
        assert_eq!(v["vz"], -2.0);
        assert_eq!(v["dt"], 0.5);
        assert!(v["speed_m_s"].is_number());
    }

    #[test]
    fn output_is_pretty_printed() {
        let json = EnrichedUpdate::new(sample(), None).to_pretty_json().unwrap();
        assert!(json.starts_with("{\n  \"clientId\": \"headset-7\",\n  \"ts\": "));
        assert!(json.contains("\n  \"position\": {\n    \"x\": 0.1,"));
    }

    #[test]
    fn top_level_key_order() {
        let velocity = VelocityEstimate {
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            speed_m_s: 0.0,
            dt: 1.0,
        };
        let json = EnrichedUpdate::new(sample(), Some(velocity))
            .to_pretty_json()
            .unwrap();
        let positions: Vec<usize> = ["\"clientId\"", "\"ts\"", "\"position\"", "\"rotation\"", "\"velocity\""]
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn deserializes_back_into_update() {
        let update = EnrichedUpdate::new(sample(), None);
        let json = update.to_pretty_json().unwrap();
        let back: EnrichedUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    proptest! {
        #[test]
        fn reparses_to_the_same_sample(
            client_id in "[a-z0-9-]{1,16}",
            ts in 0.0f64..1e12,
            px in -1e4f64..1e4, py in -1e4f64..1e4, pz in -1e4f64..1e4,
            rx in -1.0f64..1.0, ry in -1.0f64..1.0, rz in -1.0f64..1.0, rw in -1.0f64..1.0,
            with_velocity in any::<bool>(),
        ) {
            let sent = PoseSample::new(
                client_id,
                ts,
                Position::new(px, py, pz),
                Rotation::new(rx, ry, rz, rw),
            );
            let velocity = with_velocity.then_some(VelocityEstimate {
                vx: px,
                vy: py,
                vz: pz,
                speed_m_s: px.hypot(py),
                dt: 0.016,
            });
            let json = EnrichedUpdate::new(sent.clone(), velocity)
                .to_pretty_json()
                .unwrap();
            let back = parse_pose(&json, 0.0).unwrap();
            prop_assert_eq!(back, sent);
        }
    }
}

//! Inbound message validation.
//!
//! [`parse_pose`] never panics on hostile input. Callers decide what to log
//! from the returned [`PoseRejection`].

use serde_json::{Map, Value};

use crate::errors::PoseRejection;
use crate::pose::{PoseSample, Position, Rotation, UNKNOWN_CLIENT_ID, normalize_timestamp};

/// Parse and validate one inbound text message.
///
/// `received_at` is the server's wall-clock time in epoch seconds; it becomes
/// the sample timestamp when the producer sent no numeric `ts`.
pub fn parse_pose(raw: &str, received_at: f64) -> Result<PoseSample, PoseRejection> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| PoseRejection::Malformed(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(PoseRejection::NotAnObject);
    };

    let position = object_field(&obj, "position")?;
    let rotation = object_field(&obj, "rotation")?;

    let position = Position::new(
        coordinate(position, "x", "position.x")?,
        coordinate(position, "y", "position.y")?,
        coordinate(position, "z", "position.z")?,
    );
    let rotation = Rotation::new(
        coordinate(rotation, "x", "rotation.x")?,
        coordinate(rotation, "y", "rotation.y")?,
        coordinate(rotation, "z", "rotation.z")?,
        coordinate(rotation, "w", "rotation.w")?,
    );

    let timestamp = obj
        .get("ts")
        .and_then(Value::as_f64)
        .map_or(received_at, normalize_timestamp);

    Ok(PoseSample {
        client_id: client_id(obj.get("clientId")),
        timestamp,
        position,
        rotation,
    })
}

fn object_field<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Map<String, Value>, PoseRejection> {
    obj.get(field)
        .and_then(Value::as_object)
        .ok_or(PoseRejection::SchemaViolation { field })
}

/// Accepts JSON numbers and numeric strings; the result must be finite.
fn coordinate(
    obj: &Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<f64, PoseRejection> {
    let parsed = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or(PoseRejection::SchemaViolation { field })
}

fn client_id(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN_CLIENT_ID.to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn full(ts: &str) -> String {
        format!(
            r#"{{"clientId":"phone","ts":{ts},"position":{{"x":1,"y":2.5,"z":-3}},"rotation":{{"x":0,"y":0,"z":0.7071,"w":0.7071}}}}"#
        )
    }

    #[test]
    fn parses_complete_message() {
        let sample = parse_pose(&full("1000.25"), NOW).unwrap();
        assert_eq!(sample.client_id, "phone");
        assert!((sample.timestamp - 1000.25).abs() < f64::EPSILON);
        assert_eq!(sample.position, Position::new(1.0, 2.5, -3.0));
        assert_eq!(sample.rotation, Rotation::new(0.0, 0.0, 0.7071, 0.7071));
    }

    #[test]
    fn millisecond_timestamp_is_normalized() {
        let sample = parse_pose(&full("1700000000123"), NOW).unwrap();
        assert!((sample.timestamp - 1_700_000_000.123).abs() < 1e-6);
    }

    #[test]
    fn missing_ts_uses_receipt_time() {
        let raw = r#"{"position":{"x":0,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        let sample = parse_pose(raw, NOW).unwrap();
        assert!((sample.timestamp - NOW).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_ts_uses_receipt_time() {
        for ts in [r#""1000""#, "true", "null", "[1]"] {
            let sample = parse_pose(&full(ts), NOW).unwrap();
            assert!((sample.timestamp - NOW).abs() < f64::EPSILON, "ts={ts}");
        }
    }

    #[test]
    fn missing_client_id_defaults_to_unknown() {
        let raw = r#"{"ts":1,"position":{"x":0,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        assert_eq!(parse_pose(raw, NOW).unwrap().client_id, "unknown");
    }

    #[test]
    fn null_client_id_defaults_to_unknown() {
        let raw = r#"{"clientId":null,"position":{"x":0,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        assert_eq!(parse_pose(raw, NOW).unwrap().client_id, "unknown");
    }

    #[test]
    fn numeric_client_id_is_rendered() {
        let raw = r#"{"clientId":42,"position":{"x":0,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        assert_eq!(parse_pose(raw, NOW).unwrap().client_id, "42");
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw = r#"{"position":{"x":"1.5","y":" 2 ","z":"0"},"rotation":{"x":0,"y":0,"z":0,"w":"1"}}"#;
        let sample = parse_pose(raw, NOW).unwrap();
        assert_eq!(sample.position, Position::new(1.5, 2.0, 0.0));
        assert!((sample.rotation.w - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert_matches!(parse_pose("{not json", NOW), Err(PoseRejection::Malformed(_)));
        assert_matches!(parse_pose("", NOW), Err(PoseRejection::Malformed(_)));
    }

    #[test]
    fn non_object_is_rejected_quietly() {
        for raw in ["[1,2,3]", "\"hello\"", "42", "null", "true"] {
            assert_matches!(parse_pose(raw, NOW), Err(PoseRejection::NotAnObject), "raw={raw}");
        }
    }

    #[test]
    fn missing_rotation_is_schema_violation() {
        let raw = r#"{"clientId":"a","ts":1,"position":{"x":0,"y":0,"z":0}}"#;
        assert_matches!(
            parse_pose(raw, NOW),
            Err(PoseRejection::SchemaViolation { field: "rotation" })
        );
    }

    #[test]
    fn missing_position_is_schema_violation() {
        let raw = r#"{"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        assert_matches!(
            parse_pose(raw, NOW),
            Err(PoseRejection::SchemaViolation { field: "position" })
        );
    }

    #[test]
    fn non_object_position_is_schema_violation() {
        let raw = r#"{"position":[0,0,0],"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        assert_matches!(
            parse_pose(raw, NOW),
            Err(PoseRejection::SchemaViolation { field: "position" })
        );
    }

    #[test]
    fn missing_component_is_schema_violation() {
        let raw = r#"{"position":{"x":0,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0}}"#;
        assert_matches!(
            parse_pose(raw, NOW),
            Err(PoseRejection::SchemaViolation { field: "rotation.w" })
        );
    }

    #[test]
    fn non_numeric_component_is_schema_violation() {
        for bad in [r#""abc""#, "true", "null", "{}", "[]"] {
            let raw = format!(
                r#"{{"position":{{"x":0,"y":{bad},"z":0}},"rotation":{{"x":0,"y":0,"z":0,"w":1}}}}"#
            );
            assert_matches!(
                parse_pose(&raw, NOW),
                Err(PoseRejection::SchemaViolation { field: "position.y" }),
                "bad={bad}"
            );
        }
    }

    // Booleans are rejected, not coerced to 1.0/0.0 the way a loose float()
    // conversion would. Do not widen `coordinate` to accept them.
    #[test]
    fn bool_coordinates_are_rejected() {
        let raw = r#"{"position":{"x":0,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0,"w":true}}"#;
        assert_matches!(
            parse_pose(raw, NOW),
            Err(PoseRejection::SchemaViolation { field: "rotation.w" })
        );

        let raw = r#"{"position":{"x":false,"y":0,"z":0},"rotation":{"x":0,"y":0,"z":0,"w":1}}"#;
        assert_matches!(
            parse_pose(raw, NOW),
            Err(PoseRejection::SchemaViolation { field: "position.x" })
        );
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        for bad in ["NaN", "inf", "-infinity"] {
            let raw = format!(
                r#"{{"position":{{"x":"{bad}","y":0,"z":0}},"rotation":{{"x":0,"y":0,"z":0,"w":1}}}}"#
            );
            assert_matches!(
                parse_pose(&raw, NOW),
                Err(PoseRejection::SchemaViolation { field: "position.x" })
            );
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = r#"{"kind":"pose","position":{"x":0,"y":0,"z":0,"extra":"ok"},"rotation":{"x":0,"y":0,"z":0,"w":1},"meta":{}}"#;
        assert!(parse_pose(raw, NOW).is_ok());
    }
}

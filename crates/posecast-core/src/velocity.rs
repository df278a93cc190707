//! Instantaneous velocity between two consecutive samples of one connection.

use serde::{Deserialize, Serialize};

use crate::pose::PoseSample;

/// Linear velocity derived from two samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityEstimate {
    /// X velocity, m/s.
    pub vx: f64,
    /// Y velocity, m/s.
    pub vy: f64,
    /// Z velocity, m/s.
    pub vz: f64,
    /// Euclidean speed, m/s.
    pub speed_m_s: f64,
    /// Elapsed time used for the rate, seconds.
    pub dt: f64,
}

/// Estimate velocity from the previous sample to the current one.
///
/// Producer clocks are not trusted to be monotonic: when `current` is older
/// than `previous` the elapsed time is measured against `server_now` instead.
/// Returns `None` without a previous sample or when the elapsed time is not
/// strictly positive.
pub fn estimate(
    previous: Option<&PoseSample>,
    current: &PoseSample,
    server_now: f64,
) -> Option<VelocityEstimate> {
    let previous = previous?;

    let dt = if current.timestamp < previous.timestamp {
        server_now - previous.timestamp
    } else {
        current.timestamp - previous.timestamp
    };
    if dt <= 0.0 || dt.is_nan() {
        return None;
    }

    let d = current.position.displacement_from(&previous.position);
    Some(VelocityEstimate {
        vx: d.x / dt,
        vy: d.y / dt,
        vz: d.z / dt,
        speed_m_s: d.norm() / dt,
        dt,
    })
}

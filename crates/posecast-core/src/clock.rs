//! Wall-clock source for receipt timestamps.

use chrono::Utc;

/// Source of the server's current time in fractional epoch seconds.
pub trait Clock: Send + Sync {
    /// Current wall-clock time, seconds since the Unix epoch.
    fn now_secs(&self) -> f64;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_precision_loss)]
    fn now_secs(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

//! Error taxonomy for the relay.
//!
//! - [`PoseRejection`]: why an inbound message was not turned into a sample.
//!   Only [`PoseRejection::Malformed`] is worth a diagnostic; the other kinds
//!   are dropped quietly because partial and control messages are routine.
//! - [`DeliveryError`]: why a single recipient did not get a broadcast.
//!   Always isolated to that recipient.

use std::time::Duration;

use thiserror::Error;

/// An inbound message that could not be turned into a [`crate::PoseSample`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseRejection {
    /// The payload is not well-formed JSON.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The payload is valid JSON but its top level is not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required field is missing, has the wrong shape, or is not a finite number.
    #[error("schema violation at `{field}`")]
    SchemaViolation {
        /// Dotted path of the offending field (e.g. `rotation.w`).
        field: &'static str,
    },
}

impl PoseRejection {
    /// Whether this rejection should be reported in the process log.
    pub fn is_reportable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::NotAnObject => "not_an_object",
            Self::SchemaViolation { .. } => "schema_violation",
        }
    }
}

/// Failure to deliver one broadcast payload to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient's transport is closed.
    #[error("connection closed")]
    Closed,

    /// The recipient's outbound queue stayed full for the whole wait window.
    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),
}

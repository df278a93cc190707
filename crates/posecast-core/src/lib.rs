//! # posecast-core
//!
//! Foundation types and pure logic for the posecast relay.
//!
//! - **Pose samples**: [`PoseSample`] with [`Position`] and [`Rotation`]
//! - **Parsing**: [`parse::parse_pose`] turns inbound text into a validated sample
//! - **Velocity**: [`velocity::estimate`] derives a [`VelocityEstimate`] from two samples
//! - **Updates**: [`EnrichedUpdate`] is the outbound broadcast record
//! - **Errors**: [`PoseRejection`] and [`DeliveryError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod clock;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod parse;
pub mod pose;
pub mod update;
pub mod velocity;

pub use clock::{Clock, SystemClock};
pub use errors::{DeliveryError, PoseRejection};
pub use ids::ConnectionId;
pub use pose::{PoseSample, Position, Rotation};
pub use update::EnrichedUpdate;
pub use velocity::VelocityEstimate;

//! WebSocket transport: per-client connection, session loop, and fan-out.

pub mod broadcast;
pub mod connection;
pub mod session;

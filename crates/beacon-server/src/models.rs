//! Database models for the beacon server.

pub mod job;

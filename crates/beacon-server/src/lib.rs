//! Beacon Server - queued Lighthouse performance audits
//!
//! This crate provides the HTTP API, the durable job queue, the single
//! worker that drains it, and the artifact store the finished reports
//! land in.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod routes;
pub mod runner;
pub mod store;
pub mod worker;

pub use error::AppError;
pub use routes::create_router;

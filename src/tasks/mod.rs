//! Background Tasks Module
//!
//! Periodic jobs that run alongside the HTTP server.
//!
//! # Tasks
//! - Health monitor: checks both cache tiers and logs state changes

mod health;

pub use health::spawn_health_monitor;

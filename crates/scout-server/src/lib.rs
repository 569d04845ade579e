//! HTTP server of the OSINT-SCOUT back office.

pub mod config;
pub mod http;
pub mod scheduler;
pub mod state;
pub mod telemetry;

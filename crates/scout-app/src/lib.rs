//! Use cases of the back office, generic over the outbound ports.

pub mod alert_service;
pub mod auth_service;
pub mod error;
pub mod evidence_service;
pub mod incident_service;
pub mod report_service;
pub mod result_service;
pub mod shield_service;
pub mod source_service;
pub mod stats_service;

#[cfg(test)]
mod testing;

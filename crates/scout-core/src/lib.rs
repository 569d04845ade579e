//! Domain model of the scam-signal back office: alerts and their workflow,
//! SOC decisions, SHIELD dispatches, evidence, forensic reports, monitoring
//! sources and the pure scoring and presentation rules around them.

mod vocabulary;

pub mod alert;
pub mod error;
pub mod events;
pub mod evidence;
pub mod ids;
pub mod incident;
pub mod notes;
pub mod presentation;
pub mod report;
pub mod shield;
pub mod signal;
pub mod source;
pub mod stats;
pub mod user;

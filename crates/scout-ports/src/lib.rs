//! Boundary of the application: the traits services depend on and the data
//! that crosses them.

pub mod error;
pub mod outbound;
pub mod types;

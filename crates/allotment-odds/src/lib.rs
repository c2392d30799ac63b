pub mod allotment;
pub mod config;
pub mod error;
pub mod telemetry;

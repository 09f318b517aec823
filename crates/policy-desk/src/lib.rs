pub mod config;
pub mod dates;
pub mod error;
pub mod import;
pub mod pipeline;
pub mod reporting;
pub mod telemetry;

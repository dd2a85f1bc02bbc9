pub mod problem;
pub mod telemetry;

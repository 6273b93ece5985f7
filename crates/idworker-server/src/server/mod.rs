pub mod config;
pub mod error;
pub mod generator;
pub mod handler;
pub mod telemetry;

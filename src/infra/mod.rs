//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod cache;
pub mod db;
pub mod error;
pub mod http;
pub mod memory;
pub mod telemetry;
pub mod uploads;

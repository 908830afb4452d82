//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod cache_warmer;
pub mod db;
pub mod error;
pub mod http;
pub mod integrations;
pub mod telemetry;

//! Domain layer types and invariants.

pub mod blocks;
pub mod entities;
pub mod error;
pub mod paths;
pub mod snapshots;
pub mod types;

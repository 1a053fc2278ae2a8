//! CLI command implementations.

pub mod common;
pub mod config;
pub mod devices;
pub mod info;
pub mod plan;
pub mod realtime;
pub mod synthesize;

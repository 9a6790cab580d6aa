//! Data models for the connection tester

pub mod config;

// Re-export main model types
pub use config::{Config, TestConfiguration};

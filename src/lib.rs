//! L4 Connection Tester
//!
//! Asserts that a TCP or UDP network path is open (or closed) by issuing a
//! configured number of connection attempts against a single endpoint,
//! writing a fixed payload on each, and comparing the observed success rate
//! against a threshold.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod signal;
pub mod tester;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use logging::{Logger, LogLevel, LogFormat};
pub use models::{Config, TestConfiguration};
pub use tester::{ConnTester, RunHandle, RunSummary, Verdict};
pub use types::Protocol;

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// One-line build description used by `--version` output
pub fn build_info() -> String {
    format!(
        "{} (commit {}, built {}, {})",
        VERSION,
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
        env!("BUILD_TIME"),
        env!("TARGET_TRIPLE"),
    )
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PROTOCOL: &str = "tcp";
    pub const DEFAULT_MESSAGE: &str = "defaultmessage";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
    pub const DEFAULT_ATTEMPTS: u32 = 1;
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(5000);
    pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 80;
    pub const DEFAULT_LOG_LEVEL: &str = "info";
    pub const DEFAULT_LOG_ENCODING: &str = "console";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}

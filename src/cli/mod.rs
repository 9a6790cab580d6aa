//! Command-line interface

use clap::Parser;

/// Asserts that a TCP or UDP network path is open by sending a payload
/// over repeated connection attempts and comparing the success rate
/// against a threshold
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "l4-client")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level: trace, debug, info, warn, error, fatal
    #[arg(short = 'l', long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log encoding: console or json
    #[arg(short = 'e', long, value_name = "ENCODING")]
    pub log_encoding: Option<String>,

    /// Transport to test: tcp or udp
    #[arg(short = 'P', long)]
    pub protocol: Option<String>,

    /// Host to connect to
    #[arg(long, value_name = "HOST")]
    pub target_host: Option<String>,

    /// Port to connect to
    #[arg(short = 'p', long, value_name = "PORT")]
    pub target_port: Option<u32>,

    /// Payload written on every connection
    #[arg(short = 'm', long)]
    pub message: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(short = 't', long, value_name = "MILLIS")]
    pub timeout: Option<u64>,

    /// Number of connection attempts
    #[arg(short = 'r', long)]
    pub attempts: Option<u32>,

    /// Milliseconds between two attempts
    #[arg(long, value_name = "MILLIS")]
    pub period: Option<u64>,

    /// Percentage of attempts that must succeed
    #[arg(long, value_name = "PERCENT")]
    pub success_threshold: Option<u32>,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Print the supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Validate CLI arguments that can be rejected before any config is loaded
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref host) = self.target_host {
            if host.trim().is_empty() {
                return Err("--target-host cannot be empty".to_string());
            }
        }

        if let Some(port) = self.target_port {
            if port == 0 || port > u32::from(u16::MAX) {
                return Err(format!("--target-port must be between 1 and 65535, got: {}", port));
            }
        }

        if self.attempts == Some(0) {
            return Err("--attempts must be greater than 0".to_string());
        }

        if let Some(threshold) = self.success_threshold {
            if threshold > 100 {
                return Err(format!("--success-threshold must be between 0 and 100, got: {}", threshold));
            }
        }

        Ok(())
    }
}

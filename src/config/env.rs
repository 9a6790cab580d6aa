//! Environment variable handling and .env file management

use crate::error::{AppError, ErrorContext, Result};
use crate::logging::{LogFormat, LogLevel};
use crate::types::Protocol;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if it exists.
    ///
    /// Variables already present in the process environment are not overwritten.
    /// Returns whether a file was loaded.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(true)
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "PROTOCOL" => {
                value.parse::<Protocol>()?;
            }
            "TARGET_HOST" => {
                if value.is_empty() {
                    return Err(AppError::config("TARGET_HOST cannot be empty"));
                }
            }
            "TARGET_PORT" => {
                let port: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid TARGET_PORT value '{}': {}", value, e)))?;
                if port == 0 || port > u32::from(u16::MAX) {
                    return Err(AppError::config(format!("TARGET_PORT must be between 1 and 65535, got: {}", port)));
                }
            }
            "TIMEOUT" => {
                let timeout: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid TIMEOUT value '{}': {}", value, e)))?;
                if timeout == 0 {
                    return Err(AppError::config("TIMEOUT must be greater than 0"));
                }
            }
            "ATTEMPTS" => {
                let attempts: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid ATTEMPTS value '{}': {}", value, e)))?;
                if attempts == 0 {
                    return Err(AppError::config("ATTEMPTS must be greater than 0"));
                }
            }
            "PERIOD" => {
                value.parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid PERIOD value '{}': {}", value, e)))?;
            }
            "SUCCESS_THRESHOLD" => {
                let threshold: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid SUCCESS_THRESHOLD value '{}': {}", value, e)))?;
                if threshold > 100 {
                    return Err(AppError::config(format!("SUCCESS_THRESHOLD must be between 0 and 100, got: {}", threshold)));
                }
            }
            "LOG_LEVEL" => {
                value.parse::<LogLevel>()?;
            }
            "LOG_ENCODING" => {
                value.parse::<LogFormat>()?;
            }
            "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // MESSAGE accepts anything; unknown variables are ignored
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PROTOCOL", "Transport to test (tcp or udp)", "tcp"),
            ("TARGET_HOST", "Host name or IP address to connect to", "127.0.0.1"),
            ("TARGET_PORT", "Port to connect to (1-65535)", "8080"),
            ("MESSAGE", "Payload written on every connection", "defaultmessage"),
            ("TIMEOUT", "Per-attempt timeout in milliseconds", "2000"),
            ("ATTEMPTS", "Number of connection attempts", "1"),
            ("PERIOD", "Milliseconds between two attempts", "5000"),
            ("SUCCESS_THRESHOLD", "Percentage of attempts that must succeed (0-100)", "80"),
            ("LOG_LEVEL", "Log level (trace, debug, info, warn, error, fatal)", "info"),
            ("LOG_ENCODING", "Log encoding (console or json)", "console"),
            ("ENABLE_COLOR", "Enable colored log output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Check an env file's contents without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}

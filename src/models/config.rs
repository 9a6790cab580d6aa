//! Configuration data model and validation

use crate::types::{AppError, Endpoint, Protocol, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw application configuration as assembled from defaults, `.env`,
/// environment variables and command-line flags. Nothing here is trusted
/// until it has been turned into a [`TestConfiguration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Transport name, `tcp` or `udp`
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Target host, either a name or an IP address
    #[serde(default)]
    pub target_host: String,

    /// Target port; wider than `u16` so out-of-range input is reported
    /// by validation instead of failing to parse
    #[serde(default)]
    pub target_port: u32,

    /// Payload written on every connection
    #[serde(default = "default_message")]
    pub message: String,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of attempts, successful or not
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Milliseconds between two scheduled attempts
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Percentage of successful attempts needed to pass
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `console` or `json`
    #[serde(default = "default_log_encoding")]
    pub log_encoding: String,

    /// Enable colored console logs
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            target_host: String::new(),
            target_port: 0,
            message: default_message(),
            timeout_ms: default_timeout_ms(),
            attempts: default_attempts(),
            period_ms: default_period_ms(),
            success_threshold: default_success_threshold(),
            log_level: default_log_level(),
            log_encoding: default_log_encoding(),
            enable_color: default_enable_color(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration aimed at `host:port`
    pub fn for_target<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            target_host: host.into(),
            target_port: u32::from(port),
            ..Self::default()
        }
    }

    /// Validate the configuration, producing the immutable form the tester runs on
    pub fn validate(&self) -> Result<TestConfiguration> {
        TestConfiguration::from_config(self)
    }

    /// Merge process environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge variables provided by `lookup` into this configuration.
    ///
    /// Variable names are the flag names upper-cased with `-` replaced by `_`.
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(protocol) = lookup("PROTOCOL") {
            self.protocol = protocol.trim().to_string();
        }

        if let Some(host) = lookup("TARGET_HOST") {
            self.target_host = host.trim().to_string();
        }

        if let Some(port) = lookup("TARGET_PORT") {
            self.target_port = parse_var("TARGET_PORT", &port)?;
        }

        if let Some(message) = lookup("MESSAGE") {
            self.message = message;
        }

        if let Some(timeout) = lookup("TIMEOUT") {
            self.timeout_ms = parse_var("TIMEOUT", &timeout)?;
        }

        if let Some(attempts) = lookup("ATTEMPTS") {
            self.attempts = parse_var("ATTEMPTS", &attempts)?;
        }

        if let Some(period) = lookup("PERIOD") {
            self.period_ms = parse_var("PERIOD", &period)?;
        }

        if let Some(threshold) = lookup("SUCCESS_THRESHOLD") {
            self.success_threshold = parse_var("SUCCESS_THRESHOLD", &threshold)?;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.trim().to_string();
        }

        if let Some(encoding) = lookup("LOG_ENCODING") {
            self.log_encoding = encoding.trim().to_string();
        }

        if let Some(enable_color) = lookup("ENABLE_COLOR") {
            self.enable_color = parse_var("ENABLE_COLOR", &enable_color)?;
        }

        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AppError::config(format!("Invalid {} value '{}': {}", name, value, e))
    })
}

/// Validated, immutable parameters of one test run.
///
/// The only way to obtain one is [`TestConfiguration::from_config`] (or the
/// equivalent `TryFrom<&Config>`), so every instance satisfies: non-empty
/// host, port in 1..=65535, at least one attempt, threshold in 0..=100 and a
/// non-zero timeout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestConfiguration {
    protocol: Protocol,
    endpoint: Endpoint,
    message: Vec<u8>,
    timeout: Duration,
    attempts: u32,
    period: Duration,
    success_threshold: u32,
}

impl TestConfiguration {
    /// Validate `config`, failing fast on the first invalid field
    pub fn from_config(config: &Config) -> Result<Self> {
        let protocol: Protocol = config.protocol.parse()?;

        let host = config.target_host.trim();
        if host.is_empty() {
            return Err(AppError::config("target-host must be provided"));
        }

        if config.target_port == 0 || config.target_port > u32::from(u16::MAX) {
            return Err(AppError::config(format!(
                "target-port must be between 1 and 65535, got: {}",
                config.target_port
            )));
        }
        let port = config.target_port as u16;

        if config.attempts == 0 {
            return Err(AppError::config("attempts must be greater than 0"));
        }

        if config.success_threshold > 100 {
            return Err(AppError::config(format!(
                "success-threshold must be between 0 and 100, got: {}",
                config.success_threshold
            )));
        }

        if config.timeout_ms == 0 {
            return Err(AppError::config("timeout must be greater than 0"));
        }

        Ok(Self {
            protocol,
            endpoint: Endpoint::new(host, port),
            message: config.message.clone().into_bytes(),
            timeout: Duration::from_millis(config.timeout_ms),
            attempts: config.attempts,
            period: Duration::from_millis(config.period_ms),
            success_threshold: config.success_threshold,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn target_host(&self) -> &str {
        &self.endpoint.host
    }

    pub fn target_port(&self) -> u16 {
        self.endpoint.port
    }

    /// Payload written on every connection
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Bound on the dial and, separately, on the write
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }
}

impl TryFrom<&Config> for TestConfiguration {
    type Error = AppError;

    fn try_from(config: &Config) -> Result<Self> {
        Self::from_config(config)
    }
}

// Default value functions for serde
fn default_protocol() -> String {
    crate::defaults::DEFAULT_PROTOCOL.to_string()
}

fn default_message() -> String {
    crate::defaults::DEFAULT_MESSAGE.to_string()
}

fn default_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_attempts() -> u32 {
    crate::defaults::DEFAULT_ATTEMPTS
}

fn default_period_ms() -> u64 {
    crate::defaults::DEFAULT_PERIOD.as_millis() as u64
}

fn default_success_threshold() -> u32 {
    crate::defaults::DEFAULT_SUCCESS_THRESHOLD
}

fn default_log_level() -> String {
    crate::defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_encoding() -> String {
    crate::defaults::DEFAULT_LOG_ENCODING.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

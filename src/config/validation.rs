//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::{Config, TestConfiguration},
    types::Protocol,
};
use std::net::IpAddr;
use std::time::Duration;

/// Runs longer than this get an informational note
const LONG_RUN: Duration = Duration::from_secs(600);

/// Timeouts below this rarely survive a real network round trip
const SHORT_TIMEOUT: Duration = Duration::from_millis(50);

/// Configuration validator producing non-fatal warnings on top of the hard checks
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration, returning warnings for settings that are legal but suspicious
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        // Hard failures first
        let test_config = config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_threshold(&test_config));
        warnings.extend(Self::validate_timing(&test_config));
        warnings.extend(Self::validate_payload(&test_config));
        warnings.extend(Self::validate_target(&test_config));

        Ok(warnings)
    }

    fn validate_threshold(config: &TestConfiguration) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.success_threshold() == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "success threshold of 0% always passes, even if no attempt succeeds".to_string(),
            ));
        } else if config.success_threshold() == 100 && config.attempts() > 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("success threshold of 100% fails on any single failure out of {} attempts", config.attempts()),
            ));
        }

        // With few attempts the achievable rates are coarse
        let step = 100 / config.attempts();
        if config.attempts() < 5 && config.success_threshold() % step.max(1) != 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "with {} attempt(s) the success rate moves in steps of about {}%",
                    config.attempts(),
                    step
                ),
            ));
        }

        warnings
    }

    fn validate_timing(config: &TestConfiguration) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.attempts() > 1 && config.period() < config.timeout() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "period of {}ms is shorter than the {}ms timeout, so attempts may overlap",
                    config.period().as_millis(),
                    config.timeout().as_millis()
                ),
            ));
        }

        if config.timeout() < SHORT_TIMEOUT {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("timeout of {}ms may be too short for a real network path", config.timeout().as_millis()),
            ));
        }

        let duration = config.period().saturating_mul(config.attempts().saturating_sub(1));
        if duration > LONG_RUN {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("scheduling all attempts will take at least {}s", duration.as_secs()),
            ));
        }

        warnings
    }

    fn validate_payload(config: &TestConfiguration) -> Vec<ValidationWarning> {
        if config.message().is_empty() {
            vec![ValidationWarning::new(
                ValidationLevel::Warning,
                "message is empty, attempts only prove that a connection can be opened".to_string(),
            )]
        } else {
            Vec::new()
        }
    }

    fn validate_target(config: &TestConfiguration) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.protocol() == Protocol::Udp {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "UDP has no handshake: a send only fails when the local stack reports an error".to_string(),
            ));
        }

        let is_local = config.target_host().eq_ignore_ascii_case("localhost")
            || config.target_host().parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false);
        if is_local {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("target {} is a loopback address", config.endpoint()),
            ));
        }

        warnings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }
}

/// Validate the configuration and collect warnings
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            target_host: "192.0.2.10".to_string(),
            target_port: 443,
            attempts: 10,
            period_ms: 5000,
            timeout_ms: 2000,
            ..Config::default()
        }
    }

    fn messages(config: &Config) -> Vec<String> {
        validate_config(config).unwrap().into_iter().map(|w| w.message).collect()
    }

    #[test]
    fn test_sensible_config_has_no_warnings() {
        assert!(messages(&config()).is_empty());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let invalid = Config { attempts: 0, ..config() };
        assert!(validate_config(&invalid).is_err());
    }

    #[test]
    fn test_zero_threshold_warns() {
        let cfg = Config { success_threshold: 0, ..config() };
        let warnings = validate_config(&cfg).unwrap();

        assert!(warnings.iter().any(|w| w.level == ValidationLevel::Warning && w.message.contains("always passes")));
    }

    #[test]
    fn test_overlapping_attempts_noted() {
        let cfg = Config { period_ms: 100, ..config() };
        assert!(messages(&cfg).iter().any(|m| m.contains("may overlap")));

        let single = Config { attempts: 1, period_ms: 100, ..config() };
        assert!(!messages(&single).iter().any(|m| m.contains("may overlap")));
    }

    #[test]
    fn test_empty_payload_warns() {
        let cfg = Config { message: String::new(), ..config() };
        assert!(messages(&cfg).iter().any(|m| m.contains("message is empty")));
    }

    #[test]
    fn test_udp_and_loopback_notes() {
        let cfg = Config {
            protocol: "udp".to_string(),
            target_host: "127.0.0.1".to_string(),
            ..config()
        };
        let msgs = messages(&cfg);

        assert!(msgs.iter().any(|m| m.contains("UDP")));
        assert!(msgs.iter().any(|m| m.contains("loopback")));
    }

    #[test]
    fn test_coarse_rate_steps_noted() {
        let cfg = Config { attempts: 3, success_threshold: 80, period_ms: 5000, ..config() };
        assert!(messages(&cfg).iter().any(|m| m.contains("steps of about 33%")));
    }

    #[test]
    fn test_long_run_noted() {
        let cfg = Config { attempts: 200, period_ms: 5000, ..config() };
        assert!(messages(&cfg).iter().any(|m| m.contains("at least 995s")));
    }
}

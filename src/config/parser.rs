//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{Config, TestConfiguration},
};

/// Configuration parser that layers defaults, `.env`, the environment and CLI flags
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli.validate().map_err(AppError::config)?;

        // Existing process variables win over the file
        EnvManager::load_env_file()?;

        let mut config = Config::default();
        config.merge_from_env()?;
        self.finish(config)
    }

    /// Build the configuration from defaults, variables given by `lookup` and CLI flags.
    ///
    /// Does not touch the `.env` file or the process environment.
    pub fn parse_with_lookup<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.merge_from_lookup(lookup)?;
        self.finish(config)
    }

    fn finish(&self, mut config: Config) -> Result<Config> {
        self.apply_cli_overrides(&mut config);

        // Fail fast on anything the tester would reject
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(ref protocol) = cli.protocol {
            config.protocol = protocol.clone();
        }
        if let Some(ref host) = cli.target_host {
            config.target_host = host.trim().to_string();
        }
        if let Some(port) = cli.target_port {
            config.target_port = port;
        }
        if let Some(ref message) = cli.message {
            config.message = message.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_ms = timeout;
        }
        if let Some(attempts) = cli.attempts {
            config.attempts = attempts;
        }
        if let Some(period) = cli.period {
            config.period_ms = period;
        }
        if let Some(threshold) = cli.success_threshold {
            config.success_threshold = threshold;
        }
        if let Some(ref level) = cli.log_level {
            config.log_level = level.clone();
        }
        if let Some(ref encoding) = cli.log_encoding {
            config.log_encoding = encoding.clone();
        }
        if cli.no_color {
            config.enable_color = false;
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &TestConfiguration) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Protocol: {}", config.protocol()));
    summary.push(format!("Target: {}", config.endpoint()));
    summary.push(format!("Message: {} bytes", config.message().len()));
    summary.push(format!("Timeout: {}ms", config.timeout().as_millis()));
    summary.push(format!("Attempts: {}", config.attempts()));
    summary.push(format!("Period: {}ms", config.period().as_millis()));
    summary.push(format!("Success Threshold: {}%", config.success_threshold()));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn vars(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&'static str, &'static str> = pairs.iter().copied().collect();
        move |key: &str| map.get(key).map(|v| v.to_string())
    }

    fn parser(args: &[&str]) -> ConfigParser {
        let mut argv = vec!["l4-client"];
        argv.extend_from_slice(args);
        ConfigParser::new(Cli::parse_from(argv))
    }

    #[test]
    fn test_defaults_with_required_target() {
        let config = parser(&["--target-host", "localhost", "-p", "80"])
            .parse_with_lookup(vars(&[]))
            .unwrap();

        assert_eq!(config.protocol, crate::defaults::DEFAULT_PROTOCOL);
        assert_eq!(config.message, crate::defaults::DEFAULT_MESSAGE);
        assert_eq!(config.timeout_ms, crate::defaults::DEFAULT_TIMEOUT.as_millis() as u64);
        assert_eq!(config.attempts, crate::defaults::DEFAULT_ATTEMPTS);
        assert_eq!(config.period_ms, crate::defaults::DEFAULT_PERIOD.as_millis() as u64);
        assert_eq!(config.success_threshold, crate::defaults::DEFAULT_SUCCESS_THRESHOLD);
        assert!(config.enable_color);
    }

    #[test]
    fn test_missing_target_host_is_config_error() {
        let err = parser(&["-p", "80"]).parse_with_lookup(vars(&[])).unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("target-host"));
    }

    #[test]
    fn test_env_values_fill_unset_flags() {
        let config = parser(&[])
            .parse_with_lookup(vars(&[
                ("TARGET_HOST", "10.0.0.1"),
                ("TARGET_PORT", "5432"),
                ("PROTOCOL", "udp"),
                ("ATTEMPTS", "7"),
            ]))
            .unwrap();

        assert_eq!(config.target_host, "10.0.0.1");
        assert_eq!(config.target_port, 5432);
        assert_eq!(config.protocol, "udp");
        assert_eq!(config.attempts, 7);
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let config = parser(&["-r", "12", "--period", "0", "--no-color"])
            .parse_with_lookup(vars(&[
                ("TARGET_HOST", "10.0.0.1"),
                ("TARGET_PORT", "22"),
                ("ATTEMPTS", "8"),
                ("PERIOD", "900"),
                ("ENABLE_COLOR", "true"),
            ]))
            .unwrap();

        assert_eq!(config.attempts, 12);
        assert_eq!(config.period_ms, 0);
        assert!(!config.enable_color);
        assert_eq!(config.target_port, 22);
    }

    #[test]
    fn test_unparsable_env_value_names_variable() {
        let err = parser(&["--target-host", "h", "-p", "1"])
            .parse_with_lookup(vars(&[("TIMEOUT", "soon")]))
            .unwrap_err();

        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("TIMEOUT"));
    }

    #[test]
    fn test_cli_validation_runs_before_env() {
        let err = parser(&["-r", "0"]).parse().unwrap_err();
        assert!(err.to_string().contains("attempts"));
    }

    #[test]
    fn test_config_summary() {
        let config = Config::for_target("example.com", 443);
        let summary = display_config_summary(&config.validate().unwrap());

        assert!(summary.contains("Protocol: tcp"));
        assert!(summary.contains("Target: example.com:443"));
        assert!(summary.contains("Attempts: 1"));
        assert!(summary.contains("Success Threshold: 80%"));
    }
}

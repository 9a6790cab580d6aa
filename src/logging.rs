//! Structured logging for the connection tester
//!
//! Loggers are plain values handed to the components that need them; there
//! is no process-wide logger. Each entry carries a level, a message and a set
//! of structured fields, and is rendered either as a console line or as JSON
//! before being handed to a [`LogSink`].

use crate::error::{AppError, Result};
use crate::models::Config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    fn colorize(&self, text: &str) -> String {
        use colored::Colorize;
        match self {
            LogLevel::Trace => text.white().to_string(),
            LogLevel::Debug => text.cyan().to_string(),
            LogLevel::Info => text.green().to_string(),
            LogLevel::Warn => text.yellow().to_string(),
            LogLevel::Error => text.red().to_string(),
            LogLevel::Fatal => text.magenta().bold().to_string(),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            _ => Err(AppError::parse(format!("unsupported encoding format: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Look up a structured field by key
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// Destination for rendered log entries
pub trait LogSink: Send + Sync {
    fn write(&self, entry: &LogEntry, rendered: &str);
}

/// Writes every entry to stderr, keeping stdout free for the verdict
#[derive(Debug, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, _entry: &LogEntry, rendered: &str) {
        let _ = writeln!(io::stderr(), "{}", rendered);
    }
}

/// Keeps entries in memory so callers can inspect what was logged
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries written so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Messages of all entries written so far, in write order
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Number of entries whose message contains `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries().iter().filter(|e| e.message.contains(needle)).count()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry, _rendered: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
    }
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    /// Correlation ID for the run
    session_id: Option<String>,
}

/// Logger with configurable level, format and sink
///
/// Cloning is cheap; clones and [`Logger::named`] children share the session
/// context and the sink.
#[derive(Clone)]
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
    /// Output format
    format: LogFormat,
    /// Logger name
    name: String,
    /// Shared context storage
    context: Arc<RwLock<LogContext>>,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .field("format", &self.format)
            .finish()
    }
}

impl Logger {
    /// Create a new logger writing to stderr at info level
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: false,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
            sink: Arc::new(StderrSink),
        }
    }

    /// Create a logger from the logging settings of a configuration
    pub fn with_config(name: &str, config: &Config) -> Result<Self> {
        let mut logger = Self::new(name);
        logger.set_level(config.log_level.parse()?);
        logger.set_format(config.log_encoding.parse()?);
        logger.set_color(config.enable_color && logger.format == LogFormat::Console);
        Ok(logger)
    }

    /// Replace the sink entries are written to
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Child logger with another component name, sharing context and sink
    pub fn named(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.name = name.to_string();
        child
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set output format
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Enable or disable colored output
    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Start a new session with a fresh correlation ID and return it
    pub async fn start_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.set_session_id(session_id.clone()).await;
        session_id
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        entry.correlation_id = self.context.read().await.session_id.clone();

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
        };
        self.sink.write(&entry, &output);
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let level_str = format!("{:>5}", entry.level.as_str());
        let formatted_level = if self.use_color {
            entry.level.colorize(&level_str)
        } else {
            level_str
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let fields_str: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}", entry.message),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error", error.to_string())
            .field("error_category", error.category())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_logger(name: &str) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(name).with_sink(sink.clone());
        (logger, sink)
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Console".parse::<LogFormat>().unwrap(), LogFormat::Console);
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("unsupported encoding format"));
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            log_level: "debug".to_string(),
            log_encoding: "json".to_string(),
            ..Default::default()
        };
        let logger = Logger::with_config("client", &config).unwrap();
        assert!(logger.would_log(LogLevel::Debug));
        assert!(!logger.would_log(LogLevel::Trace));
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);
    }

    #[test]
    fn test_logger_with_invalid_config() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(Logger::with_config("client", &config).is_err());
    }

    #[tokio::test]
    async fn test_entries_below_min_level_are_dropped() {
        let (logger, sink) = memory_logger("test");
        logger.debug("hidden").log().await;
        logger.info("shown").log().await;
        logger.warn("also shown").log().await;

        assert_eq!(sink.messages(), vec!["shown".to_string(), "also shown".to_string()]);
    }

    #[tokio::test]
    async fn test_fields_and_session_context() {
        let (logger, sink) = memory_logger("test");
        let session_id = logger.start_session().await;

        logger.info("attempt finished")
            .field("attempt", 3)
            .field("success", true)
            .log()
            .await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.correlation_id.as_deref(), Some(session_id.as_str()));
        assert_eq!(entry.field("attempt"), Some(&serde_json::json!(3)));
        assert_eq!(entry.field("success"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_named_children_share_sink_and_context() {
        let (logger, sink) = memory_logger("client");
        logger.set_session_id("0123456789abcdef".to_string()).await;
        let child = logger.named("attempt");

        child.info("from child").log().await;

        let entries = sink.entries();
        assert_eq!(entries[0].logger, "attempt");
        assert_eq!(entries[0].correlation_id.as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_log_formats() {
        let logger = Logger::new("test");
        let mut fields = BTreeMap::new();
        fields.insert("rate".to_string(), serde_json::json!(80));
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "success rate of: 80".to_string(),
            logger: "test".to_string(),
            correlation_id: Some("abcdef0123456789".to_string()),
            fields,
        };

        let console = logger.format_console(&entry);
        assert!(console.contains(" INFO [test] success rate of: 80"));
        assert!(console.contains("[abcdef01]"));
        assert!(console.contains("{rate=80}"));

        let json = logger.format_json(&entry);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], "success rate of: 80");
        assert_eq!(parsed["fields"]["rate"], 80);
    }

    #[tokio::test]
    async fn test_error_info_fields() {
        let (logger, sink) = memory_logger("test");
        logger.error("configuration rejected")
            .error_info(&AppError::config("attempts must be greater than 0"))
            .log()
            .await;

        let entry = &sink.entries()[0];
        assert_eq!(entry.field("error_category"), Some(&serde_json::json!("CONFIG")));
        assert_eq!(entry.field("error_exit_code"), Some(&serde_json::json!(1)));
    }
}

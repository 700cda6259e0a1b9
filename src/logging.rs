//! Structured logging for the Wi-Fi speedtest
//!
//! This module provides:
//! - Structured logging with levels, correlation ids and JSON fields
//! - Debug mode JSON output for log aggregators
//! - Component loggers for external commands, band trials and error events
//!
//! Every entry goes to stderr; stdout carries only command results.

use crate::error::{AppError, Result};
use crate::models::{Config, Measurement, NetworkIdentity};
use crate::controller::TrialState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
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

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
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

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: false,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// A logger that shares this one's level, format and session context under another name
    pub fn named(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Builder-style minimum level override
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

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

    pub fn fatal(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Fatal, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        let output = self.format_entry(&entry);
        let _ = writeln!(io::stderr(), "{}", output);
    }

    fn format_entry(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter()
                .filter(|(k, _)| k.as_str() != "session_id")
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            if !fields.is_empty() {
                output.push_str(&format!(" {{{}}}", fields.join(", ")));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
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
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
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
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logs external command invocations and their failures
#[derive(Clone)]
pub struct CommandLogger {
    logger: Logger,
}

impl CommandLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("CMD") }
    }

    pub async fn log_invocation(&self, program: &str, args: &[String]) {
        self.logger.debug(&format!("Running {} {}", program, args.join(" ")))
            .field("program", program)
            .field("args", args)
            .log()
            .await;
    }

    /// Log a non-zero exit with the child's stderr
    pub async fn log_failure(&self, program: &str, status: Option<i32>, stderr: &str) {
        self.logger.warn(&format!("{} exited with {}: {}",
                program,
                status.map_or("signal".to_string(), |c| c.to_string()),
                stderr.trim()))
            .field("program", program)
            .field("exit_code", status)
            .field("stderr", stderr.trim())
            .log()
            .await;
    }

    pub async fn log_spawn_error(&self, program: &str, error: &str) {
        self.logger.warn(&format!("Failed to start {}: {}", program, error))
            .field("program", program)
            .field("error", error)
            .log()
            .await;
    }
}

/// Logs band trial progress
#[derive(Clone)]
pub struct TrialLogger {
    logger: Logger,
}

impl TrialLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("TRIAL") }
    }

    pub async fn log_sweep_start(&self, identity: &NetworkIdentity, tool: &str, correlation_id: &str) {
        self.logger.info(&format!("Starting band sweep on {} ({}) with {}",
                identity.interface, identity.profile_name, tool))
            .correlation_id(correlation_id)
            .field("interface", &identity.interface)
            .field("profile", &identity.profile_name)
            .field("tool", tool)
            .log()
            .await;
    }

    pub async fn log_transition(&self, band: &str, state: TrialState, correlation_id: &str) {
        self.logger.debug(&format!("{} -> {:?}", band, state))
            .correlation_id(correlation_id)
            .field("band", band)
            .field("state", format!("{:?}", state))
            .log()
            .await;
    }

    pub async fn log_measurement(&self, measurement: &Measurement, correlation_id: &str) {
        self.logger.info(&format!("{}: {} Mbps ({})",
                measurement.band, measurement.speed_display(), measurement.status))
            .correlation_id(correlation_id)
            .field("band", &measurement.band)
            .field("frequency_mhz", measurement.frequency_mhz)
            .field("width_mhz", measurement.width_mhz)
            .field("speed_mbps", measurement.speed_mbps)
            .field("status", measurement.status)
            .log()
            .await;
    }

    pub async fn log_restore(&self, profile: &str, success: bool, correlation_id: &str) {
        let level = if success { LogLevel::Info } else { LogLevel::Error };
        self.logger.log(level, &format!("Restored automatic band on {}: {}",
                profile, if success { "ok" } else { "failed" }))
            .correlation_id(correlation_id)
            .field("profile", profile)
            .field("success", success)
            .log()
            .await;
    }
}

/// Error event logger with enhanced context
#[derive(Clone)]
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger: logger.named("ERR") }
    }

    /// Log an application error with full context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = if let Some(ctx) = context {
            format!("{}: {}", ctx, error)
        } else {
            error.to_string()
        };

        let mut builder = self.logger.error(&message).error_info(error);

        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }

        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }

        builder.log().await;
    }

    /// Log a per-trial error that was absorbed into a degraded measurement
    pub async fn log_degraded(&self, band: &str, error: &AppError, correlation_id: &str) {
        self.logger.warn(&format!("{} trial degraded: {}", band, error))
            .correlation_id(correlation_id)
            .field("band", band)
            .error_info(error)
            .log()
            .await;
    }
}

/// Creates loggers that share one session id
pub struct LoggerFactory {
    root: Logger,
    session_id: String,
}

impl LoggerFactory {
    pub async fn new(config: &Config) -> Self {
        let root = Logger::with_config("WST", config);
        let session_id = Uuid::new_v4().to_string();
        root.set_session_id(session_id.clone()).await;
        Self { root, session_id }
    }

    pub fn create_logger(&self, name: &str) -> Logger {
        self.root.named(name)
    }

    pub fn create_command_logger(&self) -> CommandLogger {
        CommandLogger::new(self.root.clone())
    }

    pub fn create_trial_logger(&self) -> TrialLogger {
        TrialLogger::new(self.root.clone())
    }

    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger::new(self.root.clone())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

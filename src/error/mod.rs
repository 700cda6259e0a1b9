//! Error handling for the Wi-Fi speedtest

use thiserror::Error;

/// Custom error types for the Wi-Fi speedtest
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No wireless interface present on the host
    #[error("No wireless interface found: {0}")]
    NoInterfaceFound(String),

    /// A wireless interface exists but is not associated with a network
    #[error("No active Wi-Fi profile: {0}")]
    NoActiveProfile(String),

    /// Selected speedtest binary is not on the execution path
    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Selected tool needs a counterpart server that was not configured
    #[error("Missing server address: {0}")]
    MissingServer(String),

    /// External command failed to spawn or exited non-zero
    #[error("Command failed: {0}")]
    Command(String),

    /// Band switch request was rejected by the network manager
    #[error("Band switch failed: {0}")]
    BandSwitch(String),

    /// Link did not come back within the probe budget
    #[error("Connectivity timeout: {0}")]
    ConnectivityTimeout(String),

    /// Speedtest tool ran but produced no usable result
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Operator interrupted the run
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// HTTP client or server errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Service discovery errors
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (tool output, CSV, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn no_interface_found<S: Into<String>>(message: S) -> Self {
        Self::NoInterfaceFound(message.into())
    }

    pub fn no_active_profile<S: Into<String>>(message: S) -> Self {
        Self::NoActiveProfile(message.into())
    }

    /// Create a new tool-unavailable error
    pub fn tool_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ToolUnavailable(message.into())
    }

    pub fn missing_server<S: Into<String>>(message: S) -> Self {
        Self::MissingServer(message.into())
    }

    /// Create a new command error
    pub fn command<S: Into<String>>(message: S) -> Self {
        Self::Command(message.into())
    }

    pub fn band_switch<S: Into<String>>(message: S) -> Self {
        Self::BandSwitch(message.into())
    }

    pub fn connectivity_timeout<S: Into<String>>(message: S) -> Self {
        Self::ConnectivityTimeout(message.into())
    }

    /// Create a new tool execution error
    pub fn tool_execution<S: Into<String>>(message: S) -> Self {
        Self::ToolExecution(message.into())
    }

    pub fn interrupted<S: Into<String>>(message: S) -> Self {
        Self::Interrupted(message.into())
    }

    /// Create a new HTTP error
    pub fn http<S: Into<String>>(message: S) -> Self {
        Self::Http(message.into())
    }

    pub fn discovery<S: Into<String>>(message: S) -> Self {
        Self::Discovery(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::NoInterfaceFound(_) | Self::NoActiveProfile(_) => "RESOLUTION",
            Self::ToolUnavailable(_) => "TOOL",
            Self::MissingServer(_) => "SERVER",
            Self::Command(_) => "COMMAND",
            Self::BandSwitch(_) => "BAND",
            Self::ConnectivityTimeout(_) => "CONNECTIVITY",
            Self::ToolExecution(_) => "TRIAL",
            Self::Interrupted(_) => "INTERRUPT",
            Self::Http(_) => "HTTP",
            Self::Discovery(_) => "DISCOVERY",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Fatal errors abort the run before any trial; the rest degrade a single trial
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::BandSwitch(_) | Self::ConnectivityTimeout(_) | Self::ToolExecution(_) | Self::Command(_) => false,
            Self::Config(_) | Self::NoInterfaceFound(_) | Self::NoActiveProfile(_) => true,
            Self::ToolUnavailable(_) | Self::MissingServer(_) | Self::Interrupted(_) => true,
            Self::Http(_) | Self::Discovery(_) | Self::Io(_) | Self::Parse(_) | Self::Internal(_) => true,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::NoInterfaceFound(msg) => {
                format!("No wireless interface: {}\n\nSuggestion: Make sure the Wi-Fi adapter is present and enabled (`nmcli device`).", msg)
            }
            Self::NoActiveProfile(msg) => {
                format!("Not connected: {}\n\nSuggestion: Connect to a Wi-Fi network before starting the test.", msg)
            }
            Self::ToolUnavailable(msg) => {
                format!("Speedtest tool missing: {}\n\nSuggestion: Install the tool or pick another one with --tool (see `wst tools`).", msg)
            }
            Self::MissingServer(msg) => {
                format!("No server configured: {}\n\nSuggestion: Set IPERF_SERVER or pass --iperf-server.", msg)
            }
            Self::Command(msg) => {
                format!("External command failed: {}\n\nSuggestion: Run the command by hand to see its full output.", msg)
            }
            Self::BandSwitch(msg) => {
                format!("Could not change the band: {}\n\nSuggestion: Check that the adapter and access point support the requested band.", msg)
            }
            Self::ConnectivityTimeout(msg) => {
                format!("Network did not come back: {}\n\nSuggestion: Increase --attempts or --settle, or use --probe http.", msg)
            }
            Self::ToolExecution(msg) => {
                format!("Speedtest failed: {}\n\nSuggestion: This may be a temporary issue. Try running the test again.", msg)
            }
            Self::Interrupted(msg) => {
                format!("Interrupted: {}\n\nThe original band setting has been restored.", msg)
            }
            Self::Http(msg) => {
                format!("HTTP request failed: {}\n\nSuggestion: Check that the node is running and reachable.", msg)
            }
            Self::Discovery(msg) => {
                format!("Service discovery failed: {}\n\nSuggestion: Check that multicast DNS is allowed on this network.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration files.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) | Self::MissingServer(_) => 1,  // Invalid configuration/usage
            Self::NoInterfaceFound(_) | Self::NoActiveProfile(_) => 2,  // Resolution failures
            Self::ToolUnavailable(_) => 3,
            Self::Command(_) | Self::BandSwitch(_) | Self::ConnectivityTimeout(_) | Self::ToolExecution(_) => 4,
            Self::Http(_) | Self::Discovery(_) => 5,
            Self::Io(_) => 6,
            Self::Interrupted(_) => 130,
            Self::Internal(_) => 99,  // Internal/unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) | Self::MissingServer(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::NoInterfaceFound(_) | Self::NoActiveProfile(_) | Self::ToolUnavailable(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Command(_) | Self::BandSwitch(_) | Self::ConnectivityTimeout(_) | Self::ToolExecution(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Interrupted(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Http(_) | Self::Discovery(_) | Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<csv::Error> for AppError {
    fn from(error: csv::Error) -> Self {
        if error.is_io_error() {
            Self::io(format!("CSV write error: {}", error))
        } else {
            Self::parse(format!("CSV parse error: {}", error))
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::http(format!("request timed out: {}", error))
        } else {
            Self::http(error.to_string())
        }
    }
}

impl From<mdns_sd::Error> for AppError {
    fn from(error: mdns_sd::Error) -> Self {
        Self::discovery(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for structured error logging and user feedback
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());
        }
    }

    /// Get formatted error summary
    pub fn format_error_summary(&self, errors: &[AppError]) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        let mut lines = vec![format!("{} error(s):", errors.len())];
        for error in errors {
            lines.push(format!("  - {}", error.format_for_console(false)));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = AppError::config("bad attempts");
        assert!(matches!(error, AppError::Config(_)));
        assert_eq!(error.to_string(), "Configuration error: bad attempts");
    }

    #[test]
    fn test_resolution_errors_share_category() {
        assert_eq!(AppError::no_interface_found("x").category(), "RESOLUTION");
        assert_eq!(AppError::no_active_profile("x").category(), "RESOLUTION");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 1);
        assert_eq!(AppError::missing_server("x").exit_code(), 1);
        assert_eq!(AppError::no_interface_found("x").exit_code(), 2);
        assert_eq!(AppError::no_active_profile("x").exit_code(), 2);
        assert_eq!(AppError::tool_unavailable("x").exit_code(), 3);
        assert_eq!(AppError::tool_execution("x").exit_code(), 4);
        assert_eq!(AppError::http("x").exit_code(), 5);
        assert_eq!(AppError::io("x").exit_code(), 6);
        assert_eq!(AppError::interrupted("x").exit_code(), 130);
        assert_eq!(AppError::internal("x").exit_code(), 99);
    }

    #[test]
    fn test_trial_level_errors_are_not_fatal() {
        assert!(!AppError::band_switch("x").is_fatal());
        assert!(!AppError::connectivity_timeout("x").is_fatal());
        assert!(!AppError::tool_execution("x").is_fatal());
        assert!(AppError::tool_unavailable("x").is_fatal());
        assert!(AppError::no_active_profile("x").is_fatal());
    }

    #[test]
    fn test_console_formatting_without_color() {
        let error = AppError::tool_unavailable("speedtest not found in PATH");
        assert_eq!(
            error.format_for_console(false),
            "[TOOL] Tool unavailable: speedtest not found in PATH"
        );
    }

    #[test]
    fn test_from_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(AppError::from(io_error), AppError::Io(_)));

        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(AppError::from(json_error), AppError::Parse(_)));

        let int_error = "abc".parse::<u32>().unwrap_err();
        assert!(matches!(AppError::from(int_error), AppError::Parse(_)));
    }

    #[test]
    fn test_user_friendly_message_has_suggestion() {
        let message = AppError::missing_server("iperf needs a server").user_friendly_message();
        assert!(message.contains("IPERF_SERVER"));
    }

    #[test]
    fn test_error_summary() {
        let reporter = ErrorReporter::new(false, false);
        assert_eq!(reporter.format_error_summary(&[]), "No errors");
        let summary = reporter.format_error_summary(&[AppError::io("disk full")]);
        assert!(summary.contains("1 error(s)"));
        assert!(summary.contains("[IO]"));
    }
}

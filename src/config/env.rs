//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::ProbeKind;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file; a missing file is not an error
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Wi-Fi Speedtest Configuration
#
# Values here are defaults; command-line flags override them.

# Speedtest tool: cloudflare, cloudflare-cli, ookla, iperf, librespeed, openspeedtest
# WST_TOOL=ookla

# iPerf3 server, required when WST_TOOL=iperf
# IPERF_SERVER=192.168.1.10

# Result files
# WST_CSV_PATH=reports/speed-test-results.csv
# WST_JSONL_PATH=reports/server_speedtests.jsonl

# Reachability probe after a band switch (ping or http)
# WST_PROBE=ping
# WST_PING_TARGET=8.8.8.8
# WST_HTTP_PROBE_URL=https://www.google.com

# Probe attempts (1-300), seconds between probes (1-60)
# WST_MAX_ATTEMPTS=30
# WST_PROBE_INTERVAL=1

# Seconds to let the radio settle after a switch (0-60)
# WST_SETTLE_SECONDS=5

# Service ports
# WST_NODE_PORT=8081
# WST_CENTER_PORT=8082

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "WST_TOOL" | "IPERF_SERVER" | "WST_PING_TARGET" | "WST_CSV_PATH" | "WST_JSONL_PATH" => {
                if value.is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "WST_PROBE" => {
                value.parse::<ProbeKind>()?;
            }
            "WST_HTTP_PROBE_URL" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid WST_HTTP_PROBE_URL '{}': {}", value, e)))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("WST_HTTP_PROBE_URL must use http or https: {}", value)));
                }
            }
            "WST_MAX_ATTEMPTS" => Self::check_range(key, value, 1, 300)?,
            "WST_PROBE_INTERVAL" => Self::check_range(key, value, 1, 60)?,
            "WST_SETTLE_SECONDS" => Self::check_range(key, value, 0, 60)?,
            "WST_NODE_PORT" | "WST_CENTER_PORT" => Self::check_range(key, value, 1, u16::MAX as u64)?,
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    fn check_range(key: &str, value: &str, min: u64, max: u64) -> Result<()> {
        let parsed: u64 = value
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
        if parsed < min || parsed > max {
            return Err(AppError::config(format!(
                "{} must be between {} and {}, got: {}",
                key, min, max, parsed
            )));
        }
        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("WST_TOOL", "Speedtest tool id or menu key", "ookla"),
            ("IPERF_SERVER", "iPerf3 server address", "192.168.1.10"),
            ("WST_CSV_PATH", "CSV results file", crate::defaults::DEFAULT_CSV_PATH),
            ("WST_JSONL_PATH", "JSON lines file written by the node", crate::defaults::DEFAULT_JSONL_PATH),
            ("WST_PROBE", "Reachability probe (ping or http)", "ping"),
            ("WST_PING_TARGET", "Host pinged after a band switch", crate::defaults::DEFAULT_PING_TARGET),
            ("WST_HTTP_PROBE_URL", "URL requested by the http probe", crate::defaults::DEFAULT_HTTP_PROBE_URL),
            ("WST_MAX_ATTEMPTS", "Probe attempts per band (1-300)", "30"),
            ("WST_PROBE_INTERVAL", "Seconds between probes (1-60)", "1"),
            ("WST_SETTLE_SECONDS", "Seconds to wait after a switch (0-60)", "5"),
            ("WST_NODE_PORT", "Node server port", "8081"),
            ("WST_CENTER_PORT", "Discovery center port", "8082"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<20} {}\n", var, description));
            help.push_str(&format!("  {:<20} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

//! Configuration data model and validation

use crate::error::{AppError, Result};
use crate::tools::ToolCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Reachability probe used while waiting for the link to come back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// ICMP echo through the system `ping`
    Ping,
    /// HTTP HEAD request
    Http,
}

impl FromStr for ProbeKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ping" | "icmp" => Ok(ProbeKind::Ping),
            "http" | "https" | "head" => Ok(ProbeKind::Http),
            other => Err(AppError::config(format!("Invalid probe '{}': expected ping or http", other))),
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Ping => f.write_str("ping"),
            ProbeKind::Http => f.write_str("http"),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Speedtest tool id or legacy numeric key
    #[serde(default = "default_tool")]
    pub tool: String,

    /// iPerf3 server address, required by the iperf tool only
    #[serde(default)]
    pub iperf_server: Option<String>,

    /// CSV results file for sweep and single runs
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// JSON lines log written by the node server
    #[serde(default = "default_jsonl_path")]
    pub jsonl_path: PathBuf,

    /// Optional human-readable sweep report
    #[serde(default)]
    pub text_report: Option<PathBuf>,

    #[serde(default = "default_probe")]
    pub probe: ProbeKind,

    /// Host pinged after a band switch; unset falls back to the iPerf
    /// server for the iperf tool, otherwise to the default target
    #[serde(default)]
    pub ping_target: Option<String>,

    #[serde(default = "default_http_probe_url")]
    pub http_probe_url: String,

    /// Connectivity probes per trial before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds between connectivity probes
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Seconds to wait after a band switch before probing
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    #[serde(default = "default_node_port")]
    pub node_port: u16,

    #[serde(default = "default_center_port")]
    pub center_port: u16,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            iperf_server: None,
            csv_path: default_csv_path(),
            jsonl_path: default_jsonl_path(),
            text_report: None,
            probe: default_probe(),
            ping_target: None,
            http_probe_url: default_http_probe_url(),
            max_attempts: default_max_attempts(),
            probe_interval_secs: default_probe_interval_secs(),
            settle_secs: default_settle_secs(),
            node_port: default_node_port(),
            center_port: default_center_port(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Target handed to the connectivity probe
    ///
    /// The HTTP probe always uses the probe URL. The ping probe uses an
    /// explicit ping target first, then the iPerf server when the selected
    /// tool needs one, then the default target.
    pub fn connectivity_target(&self) -> String {
        match self.probe {
            ProbeKind::Http => self.http_probe_url.clone(),
            ProbeKind::Ping => {
                if let Some(target) = &self.ping_target {
                    return target.clone();
                }
                match &self.iperf_server {
                    Some(server) if self.tool_needs_server() => server.clone(),
                    _ => crate::defaults::DEFAULT_PING_TARGET.to_string(),
                }
            }
        }
    }

    fn tool_needs_server(&self) -> bool {
        ToolCatalog::new()
            .get(&self.tool)
            .is_some_and(|tool| tool.format.needs_server())
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(AppError::config("Tool cannot be empty"));
        }

        if let Some(server) = &self.iperf_server {
            if server.trim().is_empty() {
                return Err(AppError::config("iPerf server address cannot be empty"));
            }
        }

        if let Some(target) = &self.ping_target {
            if target.trim().is_empty() {
                return Err(AppError::config("Ping target cannot be empty"));
            }
        }

        match url::Url::parse(&self.http_probe_url) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!(
                        "HTTP probe URL must use http or https: {}",
                        self.http_probe_url
                    )));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!(
                    "Invalid HTTP probe URL '{}': {}",
                    self.http_probe_url, e
                )));
            }
        }

        if self.max_attempts == 0 || self.max_attempts > 300 {
            return Err(AppError::config(format!(
                "Max attempts must be between 1 and 300, got: {}",
                self.max_attempts
            )));
        }

        if self.probe_interval_secs == 0 || self.probe_interval_secs > 60 {
            return Err(AppError::config(format!(
                "Probe interval must be between 1 and 60 seconds, got: {}",
                self.probe_interval_secs
            )));
        }

        if self.settle_secs > 60 {
            return Err(AppError::config(format!(
                "Settle delay cannot exceed 60 seconds, got: {}",
                self.settle_secs
            )));
        }

        if self.node_port == 0 || self.center_port == 0 {
            return Err(AppError::config("Ports must be greater than 0"));
        }

        if self.csv_path.as_os_str().is_empty() || self.jsonl_path.as_os_str().is_empty() {
            return Err(AppError::config("Report paths cannot be empty"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(server) = std::env::var("IPERF_SERVER") {
            let server = server.trim();
            if !server.is_empty() {
                self.iperf_server = Some(server.to_string());
            }
        }

        if let Ok(tool) = std::env::var("WST_TOOL") {
            self.tool = tool.trim().to_string();
        }

        if let Ok(path) = std::env::var("WST_CSV_PATH") {
            self.csv_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("WST_JSONL_PATH") {
            self.jsonl_path = PathBuf::from(path);
        }

        if let Some(probe) = env_value::<ProbeKind>("WST_PROBE")? {
            self.probe = probe;
        }

        if let Ok(target) = std::env::var("WST_PING_TARGET") {
            self.ping_target = Some(target.trim().to_string());
        }

        if let Ok(url) = std::env::var("WST_HTTP_PROBE_URL") {
            self.http_probe_url = url.trim().to_string();
        }

        if let Some(attempts) = env_value::<u32>("WST_MAX_ATTEMPTS")? {
            self.max_attempts = attempts;
        }

        if let Some(interval) = env_value::<u64>("WST_PROBE_INTERVAL")? {
            self.probe_interval_secs = interval;
        }

        if let Some(settle) = env_value::<u64>("WST_SETTLE_SECONDS")? {
            self.settle_secs = settle;
        }

        if let Some(port) = env_value::<u16>("WST_NODE_PORT")? {
            self.node_port = port;
        }

        if let Some(port) = env_value::<u16>("WST_CENTER_PORT")? {
            self.center_port = port;
        }

        if let Some(enable_color) = env_value::<bool>("ENABLE_COLOR")? {
            self.enable_color = enable_color;
        }

        Ok(())
    }
}

fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_tool() -> String {
    crate::defaults::DEFAULT_TOOL.to_string()
}

fn default_csv_path() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_CSV_PATH)
}

fn default_jsonl_path() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_JSONL_PATH)
}

fn default_probe() -> ProbeKind {
    ProbeKind::Ping
}

fn default_http_probe_url() -> String {
    crate::defaults::DEFAULT_HTTP_PROBE_URL.to_string()
}

fn default_max_attempts() -> u32 {
    crate::defaults::DEFAULT_MAX_ATTEMPTS
}

fn default_probe_interval_secs() -> u64 {
    crate::defaults::DEFAULT_PROBE_INTERVAL.as_secs()
}

fn default_settle_secs() -> u64 {
    crate::defaults::DEFAULT_SETTLE_DELAY.as_secs()
}

fn default_node_port() -> u16 {
    crate::defaults::DEFAULT_NODE_PORT
}

fn default_center_port() -> u16 {
    crate::defaults::DEFAULT_CENTER_PORT
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

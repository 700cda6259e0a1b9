//! Speedtest tool table, invocation and output parsing

pub mod adapter;
pub mod parsers;

pub use adapter::ToolAdapter;

use crate::command::find_in_path;
use crate::error::{AppError, Result};
use crate::models::round_mbps;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

/// How a tool is invoked and how its output is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// No flags; scrape the first Mbps figure
    PlainText,
    /// Ookla JSON with a `--simple` text fallback
    JsonOokla,
    /// `--json` with a top-level `download` in Mbps
    JsonGeneric,
    /// Reverse-mode iPerf3 against a server
    JsonIperf,
    /// Fixed-size curl download from Cloudflare
    CloudflareDownload,
}

impl OutputFormat {
    /// Command line arguments for this format
    pub fn args(&self, server: Option<&str>) -> Result<Vec<String>> {
        let args: Vec<String> = match self {
            OutputFormat::PlainText => Vec::new(),
            OutputFormat::JsonOokla => to_args(&["--accept-license", "--accept-gdpr", "-f", "json"]),
            OutputFormat::JsonGeneric => to_args(&["--json"]),
            OutputFormat::JsonIperf => {
                let server = server
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| AppError::missing_server("iperf requires IPERF_SERVER or --iperf-server"))?;
                let duration = crate::defaults::IPERF_DURATION_SECS.to_string();
                to_args(&["-c", server, "-R", "-t", duration.as_str(), "--json"])
            }
            OutputFormat::CloudflareDownload => to_args(&[
                "-s",
                "-w",
                "%{speed_download}",
                "-o",
                "/dev/null",
                crate::defaults::CLOUDFLARE_DOWNLOAD_URL,
            ]),
        };
        Ok(args)
    }

    /// Parse tool output into Mbps, rounded to two decimals
    pub fn parse(&self, output: &str) -> Result<f64> {
        let raw = match self {
            OutputFormat::PlainText => parsers::parse_plain_text(output),
            OutputFormat::JsonOokla => parsers::parse_ookla_json(output),
            OutputFormat::JsonGeneric => parsers::parse_generic_json(output),
            OutputFormat::JsonIperf => parsers::parse_iperf_json(output),
            OutputFormat::CloudflareDownload => parsers::parse_curl_speed(output),
        }?;
        Ok(round_mbps(raw))
    }

    pub fn needs_server(&self) -> bool {
        matches!(self, OutputFormat::JsonIperf)
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// One row of the tool table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub binary: &'static str,
    pub format: OutputFormat,
    /// Legacy numeric menu key
    #[serde(skip)]
    pub menu_key: Option<&'static str>,
}

/// The supported tools, built once and passed to whoever needs it
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        let tools = vec![
            ToolDescriptor {
                id: "cloudflare",
                display_name: "Cloudflare",
                binary: "curl",
                format: OutputFormat::CloudflareDownload,
                menu_key: Some("1"),
            },
            ToolDescriptor {
                id: "cloudflare-cli",
                display_name: "Cloudflare CLI",
                binary: "speed-cloudflare-cli",
                format: OutputFormat::PlainText,
                menu_key: None,
            },
            ToolDescriptor {
                id: "ookla",
                display_name: "Ookla Speedtest",
                binary: "speedtest",
                format: OutputFormat::JsonOokla,
                menu_key: Some("2"),
            },
            ToolDescriptor {
                id: "iperf",
                display_name: "iPerf3",
                binary: "iperf3",
                format: OutputFormat::JsonIperf,
                menu_key: Some("3"),
            },
            ToolDescriptor {
                id: "librespeed",
                display_name: "LibreSpeed",
                binary: "librespeed-cli",
                format: OutputFormat::JsonGeneric,
                menu_key: Some("4"),
            },
            ToolDescriptor {
                id: "openspeedtest",
                display_name: "OpenSpeedTest",
                binary: "openspeedtest",
                format: OutputFormat::PlainText,
                menu_key: Some("5"),
            },
        ];
        Self { tools }
    }

    /// Look up by id (case-insensitive) or numeric menu key
    pub fn get(&self, key: &str) -> Option<&ToolDescriptor> {
        let key = key.trim();
        self.tools
            .iter()
            .find(|t| t.id.eq_ignore_ascii_case(key) || t.menu_key == Some(key))
    }

    pub fn resolve(&self, key: &str) -> Result<&ToolDescriptor> {
        self.get(key).ok_or_else(|| {
            AppError::config(format!("Unknown tool: {} (expected one of {})", key, self.ids().join(", ")))
        })
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn is_installed(descriptor: &ToolDescriptor) -> bool {
        find_in_path(descriptor.binary).is_some()
    }

    /// Path of the tool's binary, or `ToolUnavailable`
    pub fn ensure_installed(descriptor: &ToolDescriptor) -> Result<PathBuf> {
        find_in_path(descriptor.binary).ok_or_else(|| {
            AppError::tool_unavailable(format!(
                "'{}' ({}) is not installed or not in PATH",
                descriptor.binary, descriptor.display_name
            ))
        })
    }
}

/// Produces one throughput figure for the current link
#[async_trait]
pub trait ThroughputMeter: Send + Sync {
    /// Display name recorded alongside each measurement
    fn tool_name(&self) -> &str;

    /// Mbps rounded to two decimals; every failure degrades to 0.0
    async fn measure(&self, interface: &str) -> f64;
}

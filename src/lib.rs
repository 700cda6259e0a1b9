//! Wi-Fi Speedtest
//!
//! Automates Wi-Fi throughput measurement: detects the active wireless
//! interface and profile, steps the radio through its bands, runs one of
//! several third-party speedtest tools on each band and records the results.
//! A small discovery/proxy service finds speedtest nodes on the local network
//! and forwards test requests to them.

pub mod app;
pub mod cli;
pub mod command;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod report;
pub mod server;
pub mod tools;
pub mod types;
pub mod wifi;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{BandTrial, Config, LinkInfo, Measurement, NetworkIdentity};
pub use controller::{BandController, SweepOutcome, SweepReport};
pub use tools::{OutputFormat, ThroughputMeter, ToolAdapter, ToolCatalog, ToolDescriptor};
pub use types::{Band, TrialStatus};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TOOL: &str = "ookla";
    pub const DEFAULT_PING_TARGET: &str = "8.8.8.8";
    pub const DEFAULT_HTTP_PROBE_URL: &str = "https://www.google.com";
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);
    pub const DEFAULT_CSV_PATH: &str = "reports/speed-test-results.csv";
    pub const DEFAULT_JSONL_PATH: &str = "reports/server_speedtests.jsonl";
    pub const DEFAULT_TEXT_REPORT_PATH: &str = "wifi_speedtest_report.txt";
    pub const DEFAULT_NODE_PORT: u16 = 8081;
    pub const DEFAULT_CENTER_PORT: u16 = 8082;
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Upstream call timeout for proxied tests; a real test takes tens of seconds.
    pub const PROXY_TIMEOUT: Duration = Duration::from_secs(60);
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

    pub const SERVICE_TYPE: &str = "_speedtest._tcp.local.";
    pub const SYS_CLASS_NET: &str = "/sys/class/net";

    pub const CLOUDFLARE_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down?bytes=50000000";
    pub const IPERF_DURATION_SECS: u32 = 5;
}

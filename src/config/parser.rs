//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{Cli, Command, MeasureArgs},
    config::env::EnvManager,
    error::Result,
    models::Config,
};
use std::path::PathBuf;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
    env_file: PathBuf,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            env_file: PathBuf::from(".env"),
        }
    }

    /// Read a different env file instead of `./.env`
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file_from(&self.env_file, self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        match &self.cli.command {
            Command::Sweep(args) => {
                apply_measure_args(&args.measure, config);
                if let Some(settle) = args.settle {
                    config.settle_secs = settle;
                }
                if let Some(report) = &args.report {
                    config.text_report = Some(report.clone());
                }
            }
            Command::Single(args) => apply_measure_args(&args.measure, config),
            Command::Node(args) => {
                if let Some(port) = args.port {
                    config.node_port = port;
                }
                if let Some(server) = &args.iperf_server {
                    config.iperf_server = Some(server.clone());
                }
                if let Some(path) = &args.jsonl {
                    config.jsonl_path = path.clone();
                }
            }
            Command::Center(args) => {
                if let Some(port) = args.port {
                    config.center_port = port;
                }
            }
            Command::Admin(_) | Command::Tools | Command::Env(_) => {}
        }

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }
    }
}

fn apply_measure_args(args: &MeasureArgs, config: &mut Config) {
    if let Some(tool) = &args.tool {
        config.tool = tool.clone();
    }
    if let Some(server) = &args.iperf_server {
        config.iperf_server = Some(server.clone());
    }
    if let Some(csv) = &args.csv {
        config.csv_path = csv.clone();
    }
    if let Some(probe) = args.probe {
        config.probe = probe;
    }
    if let Some(target) = &args.target {
        match config.probe {
            crate::models::ProbeKind::Ping => config.ping_target = Some(target.clone()),
            crate::models::ProbeKind::Http => config.http_probe_url = target.clone(),
        }
    }
    if let Some(attempts) = args.attempts {
        config.max_attempts = attempts;
    }
    if let Some(interval) = args.interval {
        config.probe_interval_secs = interval;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Tool: {}", config.tool));
    summary.push(format!(
        "iPerf Server: {}",
        config.iperf_server.as_deref().unwrap_or("(none)")
    ));
    summary.push(format!("CSV Path: {}", config.csv_path.display()));
    summary.push(format!("JSONL Path: {}", config.jsonl_path.display()));
    summary.push(format!(
        "Probe: {} -> {} ({} attempts, {}s apart)",
        config.probe,
        config.connectivity_target(),
        config.max_attempts,
        config.probe_interval_secs
    ));
    summary.push(format!("Settle Delay: {}s", config.settle_secs));
    summary.push(format!("Ports: node {}, center {}", config.node_port, config.center_port));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvManager;
    use crate::models::ProbeKind;
    use clap::Parser;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Environment variables are process-wide
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            env::remove_var(name);
        }
    }

    fn parse(args: &[&str], dir: &TempDir) -> Result<Config> {
        ConfigParser::new(Cli::parse_from(args))
            .with_env_file(dir.path().join(".env"))
            .parse()
    }

    #[test]
    fn test_defaults_without_environment() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        let config = parse(&["wst", "sweep"], &dir).unwrap();
        assert_eq!(config.tool, crate::defaults::DEFAULT_TOOL);
        assert_eq!(config.max_attempts, crate::defaults::DEFAULT_MAX_ATTEMPTS);
        assert!(config.text_report.is_none());
    }

    #[test]
    fn test_cli_overrides_environment() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        env::set_var("WST_TOOL", "librespeed");
        env::set_var("WST_MAX_ATTEMPTS", "12");
        let config = parse(&["wst", "sweep", "--tool", "iperf", "--iperf-server", "10.0.0.2"], &dir).unwrap();
        clear_env();

        assert_eq!(config.tool, "iperf");
        assert_eq!(config.iperf_server.as_deref(), Some("10.0.0.2"));
        assert_eq!(config.max_attempts, 12);
    }

    #[test]
    fn test_env_file_is_lowest_priority() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "WST_SETTLE_SECONDS=9\nWST_PROBE=http\n").unwrap();

        env::set_var("WST_PROBE", "ping");
        let config = parse(&["wst", "sweep"], &dir).unwrap();
        clear_env();

        assert_eq!(config.settle_secs, 9);
        assert_eq!(config.probe, ProbeKind::Ping);
    }

    #[test]
    fn test_invalid_environment_value_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        env::set_var("WST_MAX_ATTEMPTS", "lots");
        let result = parse(&["wst", "single"], &dir);
        clear_env();

        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("WST_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_out_of_range_flag_fails_validation() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        assert!(parse(&["wst", "sweep", "--attempts", "0"], &dir).is_err());
        assert!(parse(&["wst", "sweep", "--settle", "61"], &dir).is_err());
    }

    #[test]
    fn test_target_follows_probe_kind() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        let config = parse(&["wst", "single", "--target", "192.168.1.1"], &dir).unwrap();
        assert_eq!(config.ping_target.as_deref(), Some("192.168.1.1"));

        let config = parse(&["wst", "single", "--probe", "http", "--target", "http://router.lan"], &dir).unwrap();
        assert_eq!(config.http_probe_url, "http://router.lan");
        assert_eq!(config.connectivity_target(), "http://router.lan");
    }

    #[test]
    fn test_ping_target_from_env_beats_iperf_server() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        env::set_var("WST_PING_TARGET", "192.168.1.1");
        let config = parse(&["wst", "sweep", "--tool", "IPERF", "--iperf-server", "10.0.0.9"], &dir).unwrap();
        clear_env();
        assert_eq!(config.connectivity_target(), "192.168.1.1");

        let config = parse(&["wst", "sweep", "--tool", "IPERF", "--iperf-server", "10.0.0.9"], &dir).unwrap();
        assert_eq!(config.connectivity_target(), "10.0.0.9");
    }

    #[test]
    fn test_service_ports_and_color() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();

        let config = parse(&["wst", "--no-color", "node", "--port", "9001"], &dir).unwrap();
        assert_eq!(config.node_port, 9001);
        assert!(!config.enable_color);

        let config = parse(&["wst", "center", "-p", "9002"], &dir).unwrap();
        assert_eq!(config.center_port, 9002);
    }

    #[test]
    fn test_summary_mentions_tool_and_probe() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("Tool: ookla"));
        assert!(summary.contains("Probe: ping -> 8.8.8.8"));
    }
}

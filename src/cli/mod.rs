//! Command-line interface

use crate::models::ProbeKind;
use crate::types::Band;
use crate::wifi::PrivilegeMode;
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Wi-Fi Speedtest - measure throughput on every radio band
#[derive(Parser, Debug, Clone)]
#[command(name = "wst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Force colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Switch through 2.4, 5 and 6 GHz and measure each band
    Sweep(SweepArgs),

    /// Measure once on the current band without switching
    Single(SingleArgs),

    /// Privileged helper used by unprivileged sweeps (run through sudo)
    #[command(subcommand)]
    Admin(AdminCommand),

    /// Serve speedtests to the discovery center
    Node(NodeArgs),

    /// Discover nodes on the local network and proxy tests to them
    Center(CenterArgs),

    /// List the supported speedtest tools
    Tools,

    /// Describe the environment variables and check the current values
    Env(EnvArgs),
}

/// Options shared by `sweep` and `single`
#[derive(Args, Debug, Clone, Default)]
pub struct MeasureArgs {
    /// Speedtest tool id or menu key (see `wst tools`)
    #[arg(short, long)]
    pub tool: Option<String>,

    /// iPerf3 server address
    #[arg(long, value_name = "HOST")]
    pub iperf_server: Option<String>,

    /// CSV results file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Reachability probe used after a band change (ping or http)
    #[arg(long)]
    pub probe: Option<ProbeKind>,

    /// Host pinged (or URL requested) by the probe
    #[arg(long, value_name = "TARGET")]
    pub target: Option<String>,

    /// Probes before a band is given up
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Seconds between probes
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// How to reach NetworkManager
    #[arg(long, value_enum, default_value_t = PrivilegeMode::Auto)]
    pub privilege: PrivilegeMode,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub measure: MeasureArgs,

    /// Seconds to wait after each band switch
    #[arg(long, value_name = "SECONDS")]
    pub settle: Option<u64>,

    /// Also write a text report (default path when no value is given)
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = crate::defaults::DEFAULT_TEXT_REPORT_PATH
    )]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SingleArgs {
    #[command(flatten)]
    pub measure: MeasureArgs,

    /// Print `{"freq": .., "speed": ..}` to stdout instead of the summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Print `interface,profile` of the active Wi-Fi connection
    GetDetails,

    /// Set the band preference of a profile and reactivate it
    SwitchBand {
        #[arg(long)]
        conn_name: String,

        /// auto, bg, a or 6g
        #[arg(long)]
        band: Band,
    },

    /// Return a profile to automatic band selection
    Cleanup {
        #[arg(long)]
        conn_name: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct NodeArgs {
    /// Listening port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not announce the node over mDNS
    #[arg(long)]
    pub no_announce: bool,

    /// Address put in the mDNS record (detected when omitted)
    #[arg(long, value_name = "IP")]
    pub advertise_ip: Option<IpAddr>,

    /// iPerf3 server used for `tool=iperf`
    #[arg(long, value_name = "HOST")]
    pub iperf_server: Option<String>,

    /// JSON lines file receiving each result
    #[arg(long, value_name = "PATH")]
    pub jsonl: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CenterArgs {
    /// Listening port
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Write an example .env file
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = ".env.example")]
    pub write_example: Option<PathBuf>,
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Sweep(_) => "sweep",
            Command::Single(_) => "single",
            Command::Admin(_) => "admin",
            Command::Node(_) => "node",
            Command::Center(_) => "center",
            Command::Tools => "tools",
            Command::Env(_) => "env",
        }
    }
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        match &self.command {
            Command::Sweep(args) => args.measure.validate(),
            Command::Single(args) => args.measure.validate(),
            Command::Admin(AdminCommand::SwitchBand { conn_name, .. })
            | Command::Admin(AdminCommand::Cleanup { conn_name }) => {
                if conn_name.trim().is_empty() {
                    Err("--conn-name cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Whether stdout must carry nothing but the command's result
    pub fn is_machine_output(&self) -> bool {
        matches!(
            self.command,
            Command::Single(SingleArgs { json: true, .. }) | Command::Admin(AdminCommand::GetDetails)
        )
    }
}

impl MeasureArgs {
    fn validate(&self) -> Result<(), String> {
        if let Some(tool) = &self.tool {
            if tool.trim().is_empty() {
                return Err("--tool cannot be empty".to_string());
            }
        }
        if let Some(server) = &self.iperf_server {
            if server.trim().is_empty() {
                return Err("--iperf-server cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}

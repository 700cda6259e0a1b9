//! Wi-Fi Speedtest - command line entry point
//!
//! Measures throughput on each radio band of the active Wi-Fi connection and
//! runs the node and discovery services used for whole-house testing.

use clap::Parser;
use std::process;
use wifi_speedtest::{
    app::{run_env, App},
    cli::{Cli, Command},
    error::{AppError, ErrorReporter, Result},
};

#[tokio::main]
async fn main() {
    // The hook only reports; unwinding continues so an active sweep can restore its band
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("If a band sweep was running, check the profile with: nmcli connection show --active");
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(2);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug && !cli.is_machine_output() {
        eprintln!("{} v{} ({})", wifi_speedtest::PKG_NAME, wifi_speedtest::VERSION, build_info());
        eprintln!("Debug mode enabled");
    }

    // Env checks must not depend on the values they report on
    if let Command::Env(args) = &cli.command {
        return run_env(args, cli.debug);
    }

    let app = App::new(cli).await?;
    match app.run().await {
        // A cancelled sweep or single run still finished cleanly
        Err(AppError::Interrupted(_)) => Ok(()),
        other => other,
    }
}

fn build_info() -> String {
    format!(
        "built {}{}",
        env!("BUILD_TIME"),
        option_env!("GIT_COMMIT").map(|c| format!(", commit {}", c)).unwrap_or_default()
    )
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Run `wst tools` to see valid tool ids");
            eprintln!("  - Run `wst env` to check every environment variable at once");
            eprintln!("  - Probe URLs must start with http:// or https://");
        }
        AppError::NoInterfaceFound(_) | AppError::NoActiveProfile(_) => {
            eprintln!();
            eprintln!("Interface detection help:");
            eprintln!("  - Make sure Wi-Fi is enabled and connected: nmcli device status");
            eprintln!("  - Without root, try --privilege unprivileged");
        }
        AppError::ToolUnavailable(_) => {
            eprintln!();
            eprintln!("Tool help:");
            eprintln!("  - Install the tool or pick another with --tool");
            eprintln!("  - `wst tools` shows which tools are installed");
        }
        AppError::MissingServer(_) => {
            eprintln!();
            eprintln!("iPerf help:");
            eprintln!("  - Start `iperf3 -s` on another machine");
            eprintln!("  - Pass --iperf-server <host> or set IPERF_SERVER");
        }
        AppError::BandSwitch(_) => {
            eprintln!();
            eprintln!("Band switching help:");
            eprintln!("  - Run as root, or allow `sudo -n wst admin` for your user");
            eprintln!("  - Check that the adapter supports the band: iw list");
        }
        AppError::Http(_) | AppError::Discovery(_) => {
            eprintln!();
            eprintln!("Service troubleshooting:");
            eprintln!("  - Check that the port is free");
            eprintln!("  - Allow UDP 5353 for mDNS through the firewall");
        }
        _ => {}
    }
}

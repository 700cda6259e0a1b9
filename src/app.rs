//! Main application orchestration and execution

use crate::{
    cli::{AdminCommand, Cli, Command, EnvArgs, NodeArgs, SingleArgs, SweepArgs},
    command::{CommandRunner, SystemCommandRunner},
    config::{load_config, EnvManager},
    connectivity::{probe_for, ConnectivityWaiter},
    controller::BandController,
    discovery::{local_ip, Announcer, DiscoveryService, NodeRegistry},
    error::{AppError, Result},
    logging::{Logger, LoggerFactory},
    models::{Config, Measurement, NetworkIdentity, UNAVAILABLE},
    output::{OutputCoordinator, OutputFormatter, OutputFormatterFactory},
    report::{hostname, CsvReportSink, JsonLinesSink, MeasurementSink, TextReport},
    server::{self, center_router, node_router, CenterState, NodeProxy, NodeState},
    tools::{ThroughputMeter, ToolAdapter, ToolCatalog, ToolDescriptor},
    types::{Band, TrialStatus},
    wifi::{
        BandSwitcher, InterfaceResolver, IwLinkInspector, LinkInspector, NetworkManagerResolver, NmcliBandSwitcher,
        WifiAdapters,
    },
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
    config: Config,
    loggers: LoggerFactory,
    catalog: ToolCatalog,
    logger: Logger,
}

impl App {
    /// Load configuration and set up logging for one invocation
    pub async fn new(cli: Cli) -> Result<Self> {
        let config = load_config(cli.clone())?;
        let loggers = LoggerFactory::new(&config).await;
        let logger = loggers.create_logger("APP");
        logger.add_context_field("command", cli.command.name()).await;

        Ok(Self {
            cli,
            config,
            loggers,
            catalog: ToolCatalog::new(),
            logger,
        })
    }

    /// Run the selected subcommand
    pub async fn run(self) -> Result<()> {
        self.logger.debug(&format!("{} v{} starting", crate::PKG_NAME, crate::VERSION))
            .field("session_id", self.loggers.session_id())
            .log()
            .await;

        match &self.cli.command {
            Command::Sweep(args) => self.run_sweep(args).await,
            Command::Single(args) => self.run_single(args).await,
            Command::Admin(command) => self.run_admin(command).await,
            Command::Node(args) => self.run_node(args).await,
            Command::Center(_) => self.run_center().await,
            Command::Tools => self.run_tools(),
            Command::Env(args) => run_env(args, self.cli.debug),
        }
    }

    fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::new(SystemCommandRunner::new(self.loggers.create_command_logger()))
    }

    fn formatter(&self) -> Box<dyn OutputFormatter> {
        let enable_color = self.config.enable_color && self.cli.use_colors();
        OutputFormatterFactory::create_formatter(enable_color, self.config.verbose)
    }

    fn meter(&self, descriptor: ToolDescriptor, runner: Arc<dyn CommandRunner>) -> ToolAdapter {
        ToolAdapter::new(descriptor, runner)
            .with_server(self.config.iperf_server.clone())
            .with_logger(self.loggers.create_logger("TOOL"))
    }

    fn waiter(&self, runner: Arc<dyn CommandRunner>) -> Result<ConnectivityWaiter> {
        let probe = probe_for(self.config.probe, runner)?;
        Ok(ConnectivityWaiter::from_config(probe, &self.config).with_logger(self.loggers.create_logger("NET")))
    }

    async fn resolve_identity(&self, adapters: &WifiAdapters) -> Result<NetworkIdentity> {
        let identity = adapters.resolver.resolve().await?;
        self.logger.info(&format!("Using {} on {}", identity.profile_name, identity.interface))
            .field("tier", adapters.tier.to_string())
            .field("strategy", adapters.resolver.strategy())
            .log()
            .await;
        Ok(identity)
    }

    async fn run_sweep(&self, args: &SweepArgs) -> Result<()> {
        let descriptor = preflight(&self.catalog, &self.config)?;
        let runner = self.runner();
        let adapters = WifiAdapters::for_tier(args.measure.privilege.resolve(), runner.clone(), std::env::current_exe()?);
        let identity = self.resolve_identity(&adapters).await?;

        let meter = Arc::new(self.meter(descriptor, runner.clone()));
        let tool_name = meter.tool_name().to_string();
        let controller = BandController::new(
            adapters.switcher.clone(),
            self.waiter(runner.clone())?,
            Arc::new(IwLinkInspector::new(runner)),
            meter,
            self.config.connectivity_target(),
        )
        .with_sink(Arc::new(CsvReportSink::new(&self.config.csv_path)))
        .with_settle_delay(self.config.settle_delay())
        .with_loggers(self.loggers.create_trial_logger(), self.loggers.create_error_logger());

        let report = controller.run(&identity, shutdown_signal()).await;

        let coordinator = OutputCoordinator::new(self.formatter());
        println!("{}", coordinator.display_sweep(&identity, &tool_name, &report)?);
        println!();
        println!("Results appended to {}", self.config.csv_path.display());

        if let Some(path) = &self.config.text_report {
            TextReport::new(&identity, &tool_name, &report).write_to(path)?;
            println!("Report written to {}", path.display());
        }

        Ok(())
    }

    async fn run_single(&self, args: &SingleArgs) -> Result<()> {
        let descriptor = preflight(&self.catalog, &self.config)?;
        let runner = self.runner();
        let adapters = WifiAdapters::for_tier(args.measure.privilege.resolve(), runner.clone(), std::env::current_exe()?);
        let identity = self.resolve_identity(&adapters).await?;
        let meter = self.meter(descriptor, runner.clone());
        let inspector = IwLinkInspector::new(runner.clone());
        let waiter = self.waiter(runner)?;
        let target = self.config.connectivity_target();

        let measurement = tokio::select! {
            biased;
            _ = shutdown_signal() => {
                self.logger.warn("Interrupted before the measurement finished").log().await;
                eprintln!("Interrupted");
                return Ok(());
            }
            m = measure_current_band(&identity, &waiter, &inspector, &meter, &target) => m,
        };

        if measurement.speed_mbps > 0.0 {
            let sink = CsvReportSink::new(&self.config.csv_path);
            sink.record(&identity, &measurement).await?;
        } else {
            self.logger.warn("No throughput measured; nothing recorded")
                .field("interface", &identity.interface)
                .log()
                .await;
        }

        if args.json {
            println!("{}", single_json(&measurement));
        } else {
            println!("{}", self.formatter().format_measurement(&identity, &measurement)?);
        }

        Ok(())
    }

    async fn run_admin(&self, command: &AdminCommand) -> Result<()> {
        let runner = self.runner();
        let formatter = self.formatter();

        match command {
            AdminCommand::GetDetails => {
                let identity = NetworkManagerResolver::new(runner).resolve().await?;
                println!("{},{}", identity.interface, identity.profile_name);
            }
            AdminCommand::SwitchBand { conn_name, band } => {
                NmcliBandSwitcher::new(runner).switch_band(conn_name, *band).await?;
                println!("{}", formatter.format_success(&format!("{} set to {}", conn_name, band))?);
            }
            AdminCommand::Cleanup { conn_name } => {
                NmcliBandSwitcher::new(runner).restore(conn_name).await?;
                println!("{}", formatter.format_success(&format!("{} back to automatic band selection", conn_name))?);
            }
        }

        Ok(())
    }

    async fn run_node(&self, args: &NodeArgs) -> Result<()> {
        let port = self.config.node_port;
        let logger = self.loggers.create_logger("NODE");
        let state = Arc::new(NodeState::new(
            self.catalog.clone(),
            self.runner(),
            self.config.iperf_server.clone(),
            JsonLinesSink::new(&self.config.jsonl_path),
            logger.clone(),
        ));

        let listener = server::bind(port).await?;

        let announcer = if args.no_announce {
            None
        } else {
            match args.advertise_ip.map(Ok).unwrap_or_else(local_ip) {
                Ok(ip) => match Announcer::register(&hostname(), ip, port) {
                    Ok(announcer) => {
                        logger.info(&format!("Announced as {}", announcer.fullname()))
                            .field("ip", ip.to_string())
                            .field("port", port)
                            .log()
                            .await;
                        Some(announcer)
                    }
                    Err(e) => {
                        logger.warn("mDNS announcement failed; serving without it").error_info(&e).log().await;
                        None
                    }
                },
                Err(e) => {
                    logger.warn("No address to announce; serving without mDNS").error_info(&e).log().await;
                    None
                }
            }
        };

        println!("Speedtest node listening on port {}", port);
        let served = server::serve(node_router(state), listener, shutdown_signal()).await;

        if let Some(announcer) = announcer {
            if let Err(e) = announcer.shutdown() {
                logger.warn("mDNS unregister failed").error_info(&e).log().await;
            }
        }

        served
    }

    async fn run_center(&self) -> Result<()> {
        let port = self.config.center_port;
        let logger = self.loggers.create_logger("CENTER");
        let registry = NodeRegistry::new();

        let discovery = DiscoveryService::start(registry.clone(), logger.clone())?;
        let proxy = NodeProxy::new(crate::defaults::PROXY_TIMEOUT)?;
        let state = Arc::new(CenterState::new(registry, proxy, logger.clone()));

        let listener = server::bind(port).await?;
        println!("Discovery center listening on port {}", port);
        let served = server::serve(center_router(state), listener, shutdown_signal()).await;

        if let Err(e) = discovery.stop() {
            logger.warn("Stopping mDNS browser failed").error_info(&e).log().await;
        }

        served
    }

    fn run_tools(&self) -> Result<()> {
        let tools: Vec<(&ToolDescriptor, bool)> = self
            .catalog
            .iter()
            .map(|tool| (tool, ToolCatalog::is_installed(tool)))
            .collect();
        println!("{}", self.formatter().format_tool_list(&tools)?);
        Ok(())
    }
}

/// Print the environment variable reference and flag invalid current values.
///
/// Runs without a resolved configuration so every bad value is reported at once.
pub fn run_env(args: &EnvArgs, debug: bool) -> Result<()> {
    EnvManager::load_env_file(debug)?;

    println!("{}", EnvManager::display_env_help());

    let warnings = EnvManager::validate_current_env();
    for warning in &warnings {
        eprintln!("{}", warning);
    }

    if let Some(path) = &args.write_example {
        EnvManager::save_example_env_file(path)?;
        println!("Example configuration written to {}", path.display());
    }

    if warnings.is_empty() {
        Ok(())
    } else {
        Err(AppError::config(format!("{} invalid environment value(s)", warnings.len())))
    }
}

/// Resolve the configured tool and check it can run before anything is touched
pub fn preflight(catalog: &ToolCatalog, config: &Config) -> Result<ToolDescriptor> {
    let descriptor = catalog.resolve(&config.tool)?.clone();

    if descriptor.format.needs_server() && config.iperf_server.is_none() {
        return Err(AppError::missing_server(format!(
            "{} needs a server: set IPERF_SERVER or pass --iperf-server",
            descriptor.display_name
        )));
    }

    ToolCatalog::ensure_installed(&descriptor)?;
    Ok(descriptor)
}

/// Wait for the link, then read it and measure once
async fn measure_current_band(
    identity: &NetworkIdentity,
    waiter: &ConnectivityWaiter,
    inspector: &dyn LinkInspector,
    meter: &dyn ThroughputMeter,
    target: &str,
) -> Measurement {
    if !waiter.wait_for_connection(target).await {
        return Measurement::sentinel(
            Band::label_for_frequency(None),
            meter.tool_name(),
            TrialStatus::ConnectivityTimeout,
        );
    }

    let link = inspector.inspect(&identity.interface).await;
    let speed = meter.measure(&identity.interface).await;
    Measurement::measured(Band::label_for_frequency(link.frequency_mhz), link, speed, meter.tool_name())
}

/// `{"freq": <MHz or "N/A">, "speed": <Mbps>}`
pub fn single_json(measurement: &Measurement) -> Value {
    let freq = match measurement.frequency_mhz {
        Some(mhz) => json!(mhz),
        None => json!(UNAVAILABLE),
    };
    json!({"freq": freq, "speed": measurement.speed_mbps})
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

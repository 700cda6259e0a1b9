//! Runs a tool and turns its output into a speed

use super::{parsers, OutputFormat, ThroughputMeter, ToolDescriptor};
use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::logging::{LogLevel, Logger};
use crate::models::round_mbps;
use async_trait::async_trait;
use std::sync::Arc;

/// A configured tool: descriptor, optional counterpart server and a runner
pub struct ToolAdapter {
    descriptor: ToolDescriptor,
    server: Option<String>,
    runner: Arc<dyn CommandRunner>,
    logger: Logger,
}

impl ToolAdapter {
    pub fn new(descriptor: ToolDescriptor, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            descriptor,
            server: None,
            runner,
            logger: Logger::new("TOOL").with_level(LogLevel::Warn),
        }
    }

    pub fn with_server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger.named("TOOL");
        self
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Run the tool once; errors keep their cause for callers that report it
    pub async fn try_run(&self, interface: &str) -> Result<f64> {
        let format = self.descriptor.format;
        let args = format.args(self.server.as_deref())?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        self.logger.info(&format!("Running {} on {}", self.descriptor.display_name, interface))
            .field("tool", self.descriptor.id)
            .field("interface", interface)
            .log()
            .await;

        let output = self.runner.capture(self.descriptor.binary, &arg_refs).await?;

        match format.parse(&output.stdout) {
            Ok(speed) => Ok(speed),
            Err(e) if format == OutputFormat::JsonOokla => {
                self.logger.debug(&format!("Ookla JSON unusable ({}), retrying with --simple", e))
                    .log()
                    .await;
                let simple = self.runner.capture(self.descriptor.binary, &["--simple"]).await?;
                parsers::parse_ookla_simple(&simple.stdout).map(round_mbps)
            }
            Err(e) if !output.success() => Err(AppError::tool_execution(format!(
                "{} exited with {}: {}",
                self.descriptor.binary,
                output.exit_code.map_or("signal".to_string(), |c| c.to_string()),
                first_line(&output.stderr).unwrap_or_else(|| e.to_string())
            ))),
            Err(e) => Err(e),
        }
    }

    /// Run the tool once; any failure becomes 0.0
    pub async fn run_tool(&self, interface: &str) -> f64 {
        match self.try_run(interface).await {
            Ok(speed) => speed,
            Err(e) => {
                self.logger.warn(&format!("{} failed: {}", self.descriptor.display_name, e))
                    .field("tool", self.descriptor.id)
                    .error_info(&e)
                    .log()
                    .await;
                0.0
            }
        }
    }
}

#[async_trait]
impl ThroughputMeter for ToolAdapter {
    fn tool_name(&self) -> &str {
        self.descriptor.display_name
    }

    async fn measure(&self, interface: &str) -> f64 {
        self.run_tool(interface).await
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

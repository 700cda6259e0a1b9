//! Console output for sweeps, single measurements and the tool table

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter};
pub use formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};

use crate::{
    controller::SweepReport,
    error::Result,
    models::NetworkIdentity,
};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: true,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Assembles the full sweep report for the console
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter }
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    pub fn display_sweep(&self, identity: &NetworkIdentity, tool: &str, report: &SweepReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.formatter.format_header("WiFi Band Speed Test Results")?);
        output.push_str("\n\n");
        output.push_str(&self.formatter.format_sweep_summary(identity, tool, report)?);
        output.push_str("\n\n");
        output.push_str(&self.formatter.format_sweep_table(report)?);

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SweepOutcome;

    #[test]
    fn test_display_sweep_sections() {
        let coordinator = OutputCoordinator::new(OutputFormatterFactory::create_formatter(false, false));
        let report = SweepReport {
            measurements: Vec::new(),
            outcome: SweepOutcome::Completed,
            restored: true,
        };
        let identity = NetworkIdentity::new("wlan0", "HomeNet");

        let text = coordinator.display_sweep(&identity, "LibreSpeed", &report).unwrap();
        assert!(text.contains("WiFi Band Speed Test Results"));
        assert!(text.contains("Tool:       LibreSpeed"));
        assert!(text.ends_with("No trials completed."));
    }
}

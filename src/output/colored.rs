//! Colored formatter implementation with terminal color support

use super::formatter::{
    align_text, fmt_err, sweep_columns, sweep_row, FormattingOptions, OutputFormatter,
};
use crate::{
    controller::SweepReport,
    error::Result,
    models::{Measurement, NetworkIdentity},
    tools::ToolDescriptor,
    types::{SpeedLevel, TrialStatus},
};
use colored::*;
use std::fmt::Write as _;

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

impl ColorScheme {
    pub fn for_speed(&self, level: SpeedLevel) -> Color {
        match level {
            SpeedLevel::Good => self.success,
            SpeedLevel::Moderate => self.warning,
            SpeedLevel::Poor => self.error,
        }
    }

    pub fn for_status(&self, status: TrialStatus) -> Color {
        if status.is_success() {
            self.success
        } else {
            self.error
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn speed_colored(&self, measurement: &Measurement, width: usize) -> ColoredString {
        let padded = align_text(&measurement.speed_display(), width, super::Alignment::Right);
        let color = self.color_scheme.for_speed(SpeedLevel::from_mbps(measurement.speed_mbps));
        self.colorize(&padded, color)
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "═".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.header),
            self.bold(title),
            self.colorize(&border, self.color_scheme.header)
        ))
    }

    fn format_sweep_summary(&self, identity: &NetworkIdentity, tool: &str, report: &SweepReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "📡 Interface: {} ({})", self.bold(&identity.interface), identity.profile_name)
            .map_err(fmt_err)?;
        writeln!(output, "🔧 Tool:      {}", self.colorize(tool, self.color_scheme.info)).map_err(fmt_err)?;
        match report.fastest() {
            Some(best) => write!(
                output,
                "🏆 Fastest:   {} at {} Mbps",
                self.bold(&best.band),
                self.colorize(&best.speed_display(), self.color_scheme.success)
            ),
            None => write!(
                output,
                "🏆 Fastest:   {}",
                self.colorize("no band produced a measurement", self.color_scheme.error)
            ),
        }
        .map_err(fmt_err)?;

        if report.is_interrupted() {
            write!(
                output,
                "\n{}",
                self.colorize("⏹  Interrupted, remaining bands skipped", self.color_scheme.warning)
            )
            .map_err(fmt_err)?;
        }
        if !report.restored {
            write!(
                output,
                "\n{}",
                self.colorize("⚠️  Automatic band selection could not be restored", self.color_scheme.error)
            )
            .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_sweep_table(&self, report: &SweepReport) -> Result<String> {
        if report.measurements.is_empty() {
            return Ok(self.colorize("No trials completed.", self.color_scheme.muted).to_string());
        }

        let verbose = self.options.verbose_mode;
        let columns = sweep_columns(verbose);
        let rows: Vec<Vec<String>> = report.measurements.iter().map(|m| sweep_row(m, verbose)).collect();
        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                rows.iter()
                    .filter_map(|r| r.get(idx))
                    .map(|cell| cell.chars().count())
                    .chain([c.min_width, c.header.len()])
                    .max()
                    .unwrap_or(c.min_width)
            })
            .collect();
        let total_width = widths.iter().sum::<usize>() + 2 * widths.len();
        let rule = "─".repeat(total_width);

        let mut output = String::new();
        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, &w)| align_text(&c.header, w, c.alignment))
            .collect();
        writeln!(output, "{}", self.bold(&header.join("  "))).map_err(fmt_err)?;
        writeln!(output, "{}", self.colorize(&rule, self.color_scheme.border)).map_err(fmt_err)?;

        let speed_idx = columns.iter().position(|c| c.header.starts_with("Speed"));
        let status_idx = columns.iter().position(|c| c.header == "Status");

        for (measurement, row) in report.measurements.iter().zip(&rows) {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(idx, cell)| {
                    let (alignment, width) = (columns[idx].alignment, widths[idx]);
                    if Some(idx) == speed_idx {
                        self.speed_colored(measurement, width).to_string()
                    } else if Some(idx) == status_idx {
                        let padded = align_text(cell, width, alignment);
                        self.colorize(&padded, self.color_scheme.for_status(measurement.status))
                            .to_string()
                    } else if cell == crate::models::UNAVAILABLE {
                        self.colorize(&align_text(cell, width, alignment), self.color_scheme.muted)
                            .to_string()
                    } else {
                        align_text(cell, width, alignment)
                    }
                })
                .collect();
            writeln!(output, "{}", cells.join("  ").trim_end()).map_err(fmt_err)?;
        }
        write!(output, "{}", self.colorize(&rule, self.color_scheme.border)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_measurement(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<String> {
        let link = measurement.link();
        Ok(format!(
            "⚡ {} on {} ({}): {} Mbps at {} MHz, width {} [{}]",
            measurement.tool,
            self.bold(&identity.interface),
            identity.profile_name,
            self.speed_colored(measurement, 0),
            link.frequency_display(),
            link.width_display(),
            measurement.band
        ))
    }

    fn format_tool_list(&self, tools: &[(&ToolDescriptor, bool)]) -> Result<String> {
        let mut output = String::new();
        for (tool, installed) in tools {
            let mark = if *installed {
                self.colorize("✓ installed", self.color_scheme.success)
            } else {
                self.colorize("✗ missing", self.color_scheme.muted)
            };
            writeln!(
                output,
                "{:>3}  {:<14} {:<16} {:<20} {}",
                tool.menu_key.unwrap_or("-"),
                tool.id,
                tool.display_name,
                tool.binary,
                mark
            )
            .map_err(fmt_err)?;
        }
        Ok(output.trim_end().to_string())
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("❌", self.color_scheme.error), self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("⚠️", self.color_scheme.warning), self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✅", self.color_scheme.success), self.colorize(message, self.color_scheme.success)))
    }
}

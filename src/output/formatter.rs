//! Core formatting trait and the plain text implementation
//!
//! Tables are drawn with ASCII borders so the output survives logs and
//! terminals without Unicode support.

use crate::{
    controller::SweepReport,
    error::{AppError, Result},
    models::{Measurement, NetworkIdentity},
    tools::ToolDescriptor,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Interface, profile, tool and the fastest band of a sweep
    fn format_sweep_summary(&self, identity: &NetworkIdentity, tool: &str, report: &SweepReport) -> Result<String>;

    /// One row per trial
    fn format_sweep_table(&self, report: &SweepReport) -> Result<String>;

    /// Result of a single measurement on the current band
    fn format_measurement(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<String>;

    /// The tool table with install status
    fn format_tool_list(&self, tools: &[(&ToolDescriptor, bool)]) -> Result<String>;

    fn format_error(&self, error: &str) -> Result<String>;

    fn format_warning(&self, warning: &str) -> Result<String>;

    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show link width and trial status columns
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Column layout shared by the plain and colored sweep tables
pub(crate) fn sweep_columns(verbose: bool) -> Vec<Column> {
    let mut columns = vec![
        Column::new("Band", Alignment::Left, 8),
        Column::new("Freq (MHz)", Alignment::Right, 10),
    ];
    if verbose {
        columns.push(Column::new("Width (MHz)", Alignment::Right, 11));
    }
    columns.push(Column::new("Speed (Mbps)", Alignment::Right, 12));
    if verbose {
        columns.push(Column::new("Status", Alignment::Left, 15));
    }
    columns
}

pub(crate) fn sweep_row(measurement: &Measurement, verbose: bool) -> RowData {
    let link = measurement.link();
    let mut row = vec![measurement.band.clone(), link.frequency_display()];
    if verbose {
        row.push(link.width_display());
    }
    row.push(measurement.speed_display());
    if verbose {
        row.push(measurement.status.to_string());
    }
    row
}

pub(crate) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    pub fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        let widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&widths));
            output.push('\n');
        }

        let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
        output.push_str(&self.create_row(&headers, &widths, format));
        output.push('\n');

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&widths));
            output.push('\n');
        }

        for row in rows {
            output.push_str(&self.create_row(row, &widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&widths));
        }

        output
    }

    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        format
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                rows.iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .chain([column.min_width, column.header.len()])
                    .max()
                    .unwrap_or(column.min_width)
            })
            .collect()
    }

    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format
                .columns
                .get(idx)
                .map(|c| c.alignment)
                .unwrap_or(Alignment::Left);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&align_text(cell, width, alignment));
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::from("+");
        for &width in widths {
            border.push_str(&"-".repeat(width + 2));
            border.push('+');
        }
        border
    }
}

/// Pad `text` to `width` characters
pub(crate) fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    match alignment {
        Alignment::Left => format!("{:<width$}", text, width = width),
        Alignment::Right => format!("{:>width$}", text, width = width),
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_sweep_summary(&self, identity: &NetworkIdentity, tool: &str, report: &SweepReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Interface:  {}", identity.interface).map_err(fmt_err)?;
        writeln!(output, "Profile:    {}", identity.profile_name).map_err(fmt_err)?;
        writeln!(output, "Tool:       {}", tool).map_err(fmt_err)?;
        match report.fastest() {
            Some(best) => write!(output, "Fastest:    {} ({} Mbps)", best.band, best.speed_display()),
            None => write!(output, "Fastest:    none"),
        }
        .map_err(fmt_err)?;

        if report.is_interrupted() {
            write!(output, "\nInterrupted: remaining bands skipped").map_err(fmt_err)?;
        }
        if !report.restored {
            write!(output, "\nWARNING: automatic band selection could not be restored").map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_sweep_table(&self, report: &SweepReport) -> Result<String> {
        if report.measurements.is_empty() {
            return Ok("No trials completed.".to_string());
        }

        let format = TableFormat {
            columns: sweep_columns(self.options.verbose_mode),
            show_borders: self.options.table_borders,
        };
        let rows: Vec<RowData> = report
            .measurements
            .iter()
            .map(|m| sweep_row(m, self.options.verbose_mode))
            .collect();

        Ok(self.create_table(&format, &rows))
    }

    fn format_measurement(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<String> {
        let link = measurement.link();
        Ok(format!(
            "{} on {} ({}): {} Mbps at {} MHz, width {} [{}]",
            measurement.tool,
            identity.interface,
            identity.profile_name,
            measurement.speed_display(),
            link.frequency_display(),
            link.width_display(),
            measurement.band
        ))
    }

    fn format_tool_list(&self, tools: &[(&ToolDescriptor, bool)]) -> Result<String> {
        let format = TableFormat {
            columns: vec![
                Column::new("Key", Alignment::Right, 3),
                Column::new("Id", Alignment::Left, 14),
                Column::new("Tool", Alignment::Left, 16),
                Column::new("Binary", Alignment::Left, 20),
                Column::new("Installed", Alignment::Left, 9),
            ],
            show_borders: self.options.table_borders,
        };
        let rows: Vec<RowData> = tools
            .iter()
            .map(|(tool, installed)| {
                vec![
                    tool.menu_key.unwrap_or("-").to_string(),
                    tool.id.to_string(),
                    tool.display_name.to_string(),
                    tool.binary.to_string(),
                    if *installed { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();

        Ok(self.create_table(&format, &rows))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}

//! Plain text sweep summary written next to the CSV

use super::ensure_parent_dir;
use crate::controller::SweepReport;
use crate::error::{AppError, Result};
use crate::models::NetworkIdentity;
use chrono::Local;
use std::fmt::Write as _;
use std::path::Path;

pub struct TextReport<'a> {
    identity: &'a NetworkIdentity,
    tool: &'a str,
    report: &'a SweepReport,
}

impl<'a> TextReport<'a> {
    pub fn new(identity: &'a NetworkIdentity, tool: &'a str, report: &'a SweepReport) -> Self {
        Self { identity, tool, report }
    }

    pub fn render(&self) -> Result<String> {
        self.render_inner()
            .map_err(|e| AppError::io(format!("Failed to format text report: {}", e)))
    }

    fn render_inner(&self) -> std::result::Result<String, std::fmt::Error> {
        let mut out = String::new();
        let title = "WiFi Band Speed Test Report";

        writeln!(out, "{}", title)?;
        writeln!(out, "{}", "=".repeat(title.len()))?;
        writeln!(out, "Date:      {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(out, "Interface: {} ({})", self.identity.interface, self.identity.profile_name)?;
        writeln!(out, "Tool:      {}", self.tool)?;

        match self.report.fastest() {
            Some(best) => writeln!(out, "Fastest:   {} at {} Mbps", best.band, best.speed_display())?,
            None => writeln!(out, "Fastest:   none (no band produced a measurement)")?,
        }
        if self.report.is_interrupted() {
            writeln!(out, "Note:      interrupted, remaining bands were skipped")?;
        }

        writeln!(out)?;
        writeln!(out, "{:<10} | {:>10} | {:>12}", "Band", "Freq (MHz)", "Speed (Mbps)")?;
        writeln!(out, "{}-+-{}-+-{}", "-".repeat(10), "-".repeat(10), "-".repeat(12))?;
        for m in &self.report.measurements {
            writeln!(
                out,
                "{:<10} | {:>10} | {:>12}",
                m.band,
                m.link().frequency_display(),
                m.speed_display()
            )?;
        }

        Ok(out)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, self.render()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SweepOutcome;
    use crate::models::{LinkInfo, Measurement};
    use crate::types::TrialStatus;

    fn report(outcome: SweepOutcome) -> SweepReport {
        SweepReport {
            measurements: vec![
                Measurement::measured(
                    "2.4GHz",
                    LinkInfo {
                        frequency_mhz: Some(2437),
                        width_mhz: Some(20),
                    },
                    48.2,
                    "iPerf3",
                ),
                Measurement::measured(
                    "5GHz",
                    LinkInfo {
                        frequency_mhz: Some(5180),
                        width_mhz: Some(80),
                    },
                    412.9,
                    "iPerf3",
                ),
                Measurement::sentinel("6GHz", "iPerf3", TrialStatus::ConnectivityTimeout),
            ],
            outcome,
            restored: true,
        }
    }

    #[test]
    fn test_render_lists_every_band_and_the_fastest() {
        let identity = NetworkIdentity::new("wlan0", "HomeNet");
        let report = report(SweepOutcome::Completed);
        let text = TextReport::new(&identity, "iPerf3", &report).render().unwrap();

        assert!(text.starts_with("WiFi Band Speed Test Report\n"));
        assert!(text.contains("Fastest:   5 GHz at 412.90 Mbps"));
        assert!(text.contains("2437"));
        assert!(text.contains(&format!("{:<10} | {:>10} | {:>12}", "6GHz", "N/A", "0.00")));
        assert!(!text.contains("interrupted"));
    }

    #[test]
    fn test_write_creates_parent_and_marks_interrupt() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out/report.txt");
        let identity = NetworkIdentity::new("wlan0", "HomeNet");
        let report = report(SweepOutcome::Interrupted);

        TextReport::new(&identity, "iPerf3", &report).write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("interrupted"));
    }
}

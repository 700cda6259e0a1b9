//! Durable records of measurements

pub mod csv_sink;
pub mod jsonl;
pub mod text;

pub use csv_sink::{hostname, CsvReportSink, ReportRow};
pub use jsonl::{JsonLinesSink, SpeedtestResult};
pub use text::TextReport;

use crate::error::Result;
use crate::models::{Measurement, NetworkIdentity};
use async_trait::async_trait;

/// Append-only destination for measurements. Never rewrites earlier records.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    async fn record(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<()>;
}

pub(crate) fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

//! The speed-test-results CSV
//!
//! Header: `Date/Time,Hostname,Tool,SSID,Interface,Band,Frequency (MHz),Width,Speed (Mbps)`.
//! The header is written only when the file is absent or empty.

use super::{ensure_parent_dir, MeasurementSink};
use crate::error::{AppError, Result};
use crate::models::{Measurement, NetworkIdentity, UNAVAILABLE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Date/Time")]
    date_time: String,
    #[serde(rename = "Hostname")]
    hostname: String,
    #[serde(rename = "Tool")]
    tool: String,
    #[serde(rename = "SSID")]
    ssid: String,
    #[serde(rename = "Interface")]
    interface: String,
    #[serde(rename = "Band")]
    band: String,
    #[serde(rename = "Frequency (MHz)")]
    frequency: String,
    #[serde(rename = "Width")]
    width: String,
    #[serde(rename = "Speed (Mbps)")]
    speed: String,
}

/// One CSV row read back with its link values parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub date_time: String,
    pub hostname: String,
    pub tool: String,
    pub ssid: String,
    pub interface: String,
    pub band: String,
    pub frequency_mhz: Option<u32>,
    pub width_mhz: Option<u32>,
    pub speed_mbps: f64,
}

impl TryFrom<CsvRecord> for ReportRow {
    type Error = AppError;

    fn try_from(record: CsvRecord) -> Result<Self> {
        Ok(Self {
            frequency_mhz: parse_optional(&record.frequency)?,
            width_mhz: parse_optional(&record.width)?,
            speed_mbps: record.speed.trim().parse()?,
            date_time: record.date_time,
            hostname: record.hostname,
            tool: record.tool,
            ssid: record.ssid,
            interface: record.interface,
            band: record.band,
        })
    }
}

fn parse_optional(value: &str) -> Result<Option<u32>> {
    let value = value.trim();
    if value.is_empty() || value == UNAVAILABLE {
        return Ok(None);
    }
    Ok(Some(value.parse()?))
}

/// Appends result rows; writes run on the blocking pool, one at a time
pub struct CsvReportSink {
    path: PathBuf,
    hostname: String,
    write_lock: Arc<Mutex<()>>,
}

impl CsvReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_hostname(path, hostname())
    }

    pub fn with_hostname(path: impl Into<PathBuf>, hostname: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hostname: hostname.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file and its header when needed
    pub fn append(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<()> {
        write_row(&self.path, &self.row(identity, measurement))
    }

    fn row(&self, identity: &NetworkIdentity, measurement: &Measurement) -> CsvRecord {
        CsvRecord {
            date_time: measurement.timestamp.to_rfc3339(),
            hostname: self.hostname.clone(),
            tool: measurement.tool.clone(),
            ssid: identity.profile_name.clone(),
            interface: identity.interface.clone(),
            band: measurement.band.clone(),
            frequency: measurement.link().frequency_display(),
            width: measurement.link().width_display(),
            speed: measurement.speed_display(),
        }
    }

    pub fn read_all(&self) -> Result<Vec<ReportRow>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize::<CsvRecord>()
            .map(|record| ReportRow::try_from(record?))
            .collect()
    }
}

#[async_trait]
impl MeasurementSink for CsvReportSink {
    async fn record(&self, identity: &NetworkIdentity, measurement: &Measurement) -> Result<()> {
        let row = self.row(identity, measurement);
        let path = self.path.clone();
        // Held until the row is written, even if this future is dropped
        let guard = self.write_lock.clone().lock_owned().await;

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            write_row(&path, &row)
        })
        .await
        .map_err(|e| AppError::internal(format!("CSV write task failed: {}", e)))?
    }
}

fn write_row(path: &Path, row: &CsvRecord) -> Result<()> {
    ensure_parent_dir(path)?;

    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

/// Contents of `/etc/hostname`, then `$HOSTNAME`, then `unknown`
pub fn hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

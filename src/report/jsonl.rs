//! Line-delimited JSON log of node speedtests

use super::{ensure_parent_dir, MeasurementSink};
use crate::error::Result;
use crate::models::{Measurement, NetworkIdentity};
use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Body of a successful `/speedtest` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedtestResult {
    pub speed_mbps: f64,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    #[serde(flatten)]
    result: &'a SpeedtestResult,
}

/// Appends one JSON object per line; safe to share between request handlers
pub struct JsonLinesSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, result: &SpeedtestResult) -> Result<()> {
        let mut line = serde_json::to_string(&JsonLine {
            timestamp: Local::now().to_rfc3339(),
            result,
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        ensure_parent_dir(&self.path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn read_all(&self) -> Result<Vec<Value>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| Ok(serde_json::from_str::<Value>(l)?))
            .collect()
    }
}

#[async_trait]
impl MeasurementSink for JsonLinesSink {
    async fn record(&self, _identity: &NetworkIdentity, measurement: &Measurement) -> Result<()> {
        self.append(&SpeedtestResult {
            speed_mbps: measurement.speed_mbps,
            tool: measurement.tool.clone(),
            duration_seconds: None,
        })
        .await
    }
}

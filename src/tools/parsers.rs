//! Output parsers for the supported speedtest tools
//!
//! Every parser returns the raw download speed in Mbps; rounding happens in
//! [`OutputFormat::parse`](super::OutputFormat::parse).

use crate::error::{AppError, Result};
use regex::Regex;
use serde_json::Value;

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Ookla `-f json`: `download.bandwidth` is bytes per second
pub fn parse_ookla_json(output: &str) -> Result<f64> {
    let data: Value = serde_json::from_str(output.trim())?;
    let bandwidth = data
        .pointer("/download/bandwidth")
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::tool_execution("Ookla output has no download.bandwidth"))?;
    Ok(bandwidth * 8.0 / BITS_PER_MEGABIT)
}

/// Ookla `--simple`: `Download: 93.41 Mbit/s`
pub fn parse_ookla_simple(output: &str) -> Result<f64> {
    first_number(r"Download:\s+([\d.]+)", output)
        .ok_or_else(|| AppError::tool_execution("Ookla simple output has no Download line"))
}

/// iPerf3 `--json`: `end.sum_received.bits_per_second`
pub fn parse_iperf_json(output: &str) -> Result<f64> {
    let data: Value = serde_json::from_str(output.trim())?;
    if let Some(error) = data.get("error").and_then(Value::as_str) {
        return Err(AppError::tool_execution(format!("iperf3: {}", error)));
    }
    let bps = data
        .pointer("/end/sum_received/bits_per_second")
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::tool_execution("iperf3 output has no end.sum_received.bits_per_second"))?;
    Ok(bps / BITS_PER_MEGABIT)
}

/// Tools whose JSON carries `download` in Mbps; a missing field reads as zero
pub fn parse_generic_json(output: &str) -> Result<f64> {
    let data: Value = serde_json::from_str(output.trim())?;
    // librespeed-cli prints an array with one result per server
    let record = match &data {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };

    match record.get("download") {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| AppError::tool_execution("download is not a finite number")),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(AppError::from),
        Some(other) => Err(AppError::tool_execution(format!("unexpected download value: {}", other))),
    }
}

/// First decimal number in front of a case-insensitive `Mbps`/`bps` token
pub fn parse_plain_text(output: &str) -> Result<f64> {
    first_number(r"(?i)([\d.]+)\s*M?bps", output)
        .ok_or_else(|| AppError::tool_execution("no Mbps figure in tool output"))
}

/// `curl -w %{speed_download}` prints bytes per second
pub fn parse_curl_speed(output: &str) -> Result<f64> {
    let bytes_per_sec: f64 = output
        .trim()
        .parse()
        .map_err(|e| AppError::tool_execution(format!("curl speed '{}': {}", output.trim(), e)))?;
    Ok(bytes_per_sec * 8.0 / BITS_PER_MEGABIT)
}

fn first_number(pattern: &str, text: &str) -> Option<f64> {
    Regex::new(pattern)
        .ok()?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

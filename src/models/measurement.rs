//! Per-run and per-trial data

use crate::types::{Band, TrialStatus};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Placeholder written wherever a link property could not be read
pub const UNAVAILABLE: &str = "N/A";

/// The wireless interface and the profile active on it
///
/// Resolved once per run and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub interface: String,
    pub profile_name: String,
}

impl NetworkIdentity {
    pub fn new(interface: impl Into<String>, profile_name: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            profile_name: profile_name.into(),
        }
    }
}

/// One entry of the built-in sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandTrial {
    pub band: Band,
    pub label: String,
}

impl BandTrial {
    pub fn new(band: Band) -> Self {
        Self {
            band,
            label: band.label().to_string(),
        }
    }

    /// The fixed 2.4 GHz, 5 GHz, 6 GHz sequence
    pub fn sequence() -> Vec<BandTrial> {
        Band::TRIAL_SEQUENCE.iter().copied().map(BandTrial::new).collect()
    }
}

/// Frequency and channel width of the current association
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub frequency_mhz: Option<u32>,
    pub width_mhz: Option<u32>,
}

impl LinkInfo {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn frequency_display(&self) -> String {
        display_optional(self.frequency_mhz)
    }

    pub fn width_display(&self) -> String {
        display_optional(self.width_mhz)
    }
}

/// Result of one trial. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub band: String,
    pub frequency_mhz: Option<u32>,
    pub width_mhz: Option<u32>,
    pub speed_mbps: f64,
    pub tool: String,
    pub timestamp: DateTime<Local>,
    pub status: TrialStatus,
}

impl Measurement {
    /// A trial in which the tool actually ran
    pub fn measured(band: impl Into<String>, link: LinkInfo, speed_mbps: f64, tool: impl Into<String>) -> Self {
        let status = if speed_mbps > 0.0 {
            TrialStatus::Measured
        } else {
            TrialStatus::ToolFailed
        };

        Self {
            band: band.into(),
            frequency_mhz: link.frequency_mhz,
            width_mhz: link.width_mhz,
            speed_mbps,
            tool: tool.into(),
            timestamp: Local::now(),
            status,
        }
    }

    /// A trial that never reached the tool: zero speed, no link data
    pub fn sentinel(band: impl Into<String>, tool: impl Into<String>, status: TrialStatus) -> Self {
        Self {
            band: band.into(),
            frequency_mhz: None,
            width_mhz: None,
            speed_mbps: 0.0,
            tool: tool.into(),
            timestamp: Local::now(),
            status,
        }
    }

    pub fn link(&self) -> LinkInfo {
        LinkInfo {
            frequency_mhz: self.frequency_mhz,
            width_mhz: self.width_mhz,
        }
    }

    pub fn speed_display(&self) -> String {
        format!("{:.2}", self.speed_mbps)
    }
}

fn display_optional(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Round a throughput value to two decimals
pub fn round_mbps(value: f64) -> f64 {
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_labels() {
        let trials = BandTrial::sequence();
        let labels: Vec<&str> = trials.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["2.4GHz", "5GHz", "6GHz"]);
    }

    #[test]
    fn test_sweep_and_single_share_band_labels() {
        for (band, mhz) in [(Band::Ghz2_4, 2412), (Band::Ghz5, 5180), (Band::Ghz6, 6115)] {
            assert_eq!(BandTrial::new(band).label, Band::label_for_frequency(Some(mhz)));
        }
    }

    #[test]
    fn test_sentinel_measurement() {
        let m = Measurement::sentinel("5GHz", "Ookla Speedtest", TrialStatus::ConnectivityTimeout);
        assert_eq!(m.speed_mbps, 0.0);
        assert_eq!(m.frequency_mhz, None);
        assert_eq!(m.status, TrialStatus::ConnectivityTimeout);
        assert_eq!(m.link().frequency_display(), "N/A");
    }

    #[test]
    fn test_zero_speed_marks_tool_failure() {
        let link = LinkInfo { frequency_mhz: Some(5180), width_mhz: Some(80) };
        assert_eq!(Measurement::measured("5GHz", link, 0.0, "iPerf3").status, TrialStatus::ToolFailed);
        assert_eq!(Measurement::measured("5GHz", link, 412.5, "iPerf3").status, TrialStatus::Measured);
    }

    #[test]
    fn test_round_mbps() {
        assert_eq!(round_mbps(93.456), 93.46);
        assert_eq!(round_mbps(100.0), 100.0);
        assert_eq!(round_mbps(f64::NAN), 0.0);
        assert_eq!(round_mbps(-3.0), 0.0);
    }
}

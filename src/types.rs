//! Type definitions shared across the crate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Radio band preference of a Wi-Fi profile
///
/// `Auto` is the single canonical "no preference" value. It renders as the
/// empty string when handed to the network manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Auto,
    Ghz2_4,
    Ghz5,
    Ghz6,
}

impl Band {
    /// Bands visited by a sweep, in order
    pub const TRIAL_SEQUENCE: [Band; 3] = [Band::Ghz2_4, Band::Ghz5, Band::Ghz6];

    /// Value of the `wifi.band` connection property
    pub fn nmcli_value(&self) -> &'static str {
        match self {
            Band::Auto => "",
            Band::Ghz2_4 => "bg",
            Band::Ghz5 => "a",
            Band::Ghz6 => "6g",
        }
    }

    /// Code accepted on the admin helper command line
    pub fn code(&self) -> &'static str {
        match self {
            Band::Auto => "auto",
            other => other.nmcli_value(),
        }
    }

    /// Short label used in reports and CSV rows
    pub fn label(&self) -> &'static str {
        match self {
            Band::Auto => "Auto",
            Band::Ghz2_4 => "2.4GHz",
            Band::Ghz5 => "5GHz",
            Band::Ghz6 => "6GHz",
        }
    }

    /// Classify an operating frequency; `None` for frequencies outside the Wi-Fi bands
    pub fn from_frequency(mhz: u32) -> Option<Band> {
        match mhz {
            2400..=2499 => Some(Band::Ghz2_4),
            5000..=5999 => Some(Band::Ghz5),
            6000..=7199 => Some(Band::Ghz6),
            _ => None,
        }
    }

    /// Band label for an optional frequency, "Unknown" when it cannot be classified
    pub fn label_for_frequency(mhz: Option<u32>) -> &'static str {
        mhz.and_then(Band::from_frequency)
            .map(|band| band.label())
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Band {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Band::Auto),
            "bg" | "2.4" | "2.4ghz" => Ok(Band::Ghz2_4),
            "a" | "5" | "5ghz" => Ok(Band::Ghz5),
            "6g" | "6" | "6ghz" => Ok(Band::Ghz6),
            other => Err(AppError::parse(format!(
                "Invalid band '{}': expected one of auto, bg, a, 6g",
                other
            ))),
        }
    }
}

/// Outcome of a single band trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    /// Tool ran and reported a non-zero speed
    Measured,
    /// Network manager rejected the band change
    SwitchFailed,
    /// Link did not come back within the probe budget
    ConnectivityTimeout,
    /// Tool ran but produced no usable value
    ToolFailed,
}

impl TrialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialStatus::Measured => "measured",
            TrialStatus::SwitchFailed => "switch failed",
            TrialStatus::ConnectivityTimeout => "no connectivity",
            TrialStatus::ToolFailed => "tool failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TrialStatus::Measured)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Throughput classification used for console coloring
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedLevel {
    /// 100 Mbps and above
    Good,
    /// 25 to 100 Mbps
    Moderate,
    /// Below 25 Mbps, including failed trials
    Poor,
}

impl SpeedLevel {
    pub fn from_mbps(mbps: f64) -> Self {
        if mbps >= 100.0 {
            Self::Good
        } else if mbps >= 25.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

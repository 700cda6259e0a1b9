//! Data models and structures for the Wi-Fi speedtest

pub mod config;
pub mod measurement;

// Re-export main model types
pub use config::{Config, ProbeKind};
pub use measurement::{round_mbps, BandTrial, LinkInfo, Measurement, NetworkIdentity, UNAVAILABLE};

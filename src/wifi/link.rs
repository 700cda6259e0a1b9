//! Link-layer status of the associated interface

use crate::command::CommandRunner;
use crate::models::LinkInfo;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

/// Reads frequency and channel width of the current association
#[async_trait]
pub trait LinkInspector: Send + Sync {
    /// Missing values come back as `None` rather than an error
    async fn inspect(&self, interface: &str) -> LinkInfo;
}

/// `iw dev <interface> link`
pub struct IwLinkInspector {
    runner: Arc<dyn CommandRunner>,
}

impl IwLinkInspector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl LinkInspector for IwLinkInspector {
    async fn inspect(&self, interface: &str) -> LinkInfo {
        match self.runner.run("iw", &["dev", interface, "link"]).await {
            Some(output) => parse_iw_link(&output),
            None => LinkInfo::unavailable(),
        }
    }
}

/// Extract `freq:` and the first `<n>MHz` token from `iw ... link` output
pub fn parse_iw_link(output: &str) -> LinkInfo {
    LinkInfo {
        frequency_mhz: capture_u32(r"freq:\s+(\d+)", output),
        width_mhz: capture_u32(r"(\d+)MHz", output),
    }
}

/// SSID of the association, `None` when the interface is not connected
pub fn parse_ssid(output: &str) -> Option<String> {
    let captures = Regex::new(r"SSID:\s+(.+)").ok()?.captures(output)?;
    let ssid = captures[1].trim();
    (!ssid.is_empty()).then(|| ssid.to_string())
}

fn capture_u32(pattern: &str, text: &str) -> Option<u32> {
    Regex::new(pattern)
        .ok()?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeRunner;

    const IW_LINK: &str = "Connected to 3c:37:86:aa:bb:cc (on wlp2s0)
	SSID: Home Network
	freq: 5180
	RX: 1842977 bytes (9851 packets)
	TX: 204414 bytes (1123 packets)
	signal: -48 dBm
	rx bitrate: 866.7 MBit/s VHT-MCS 9 80MHz short GI VHT-NSS 2
	tx bitrate: 780.0 MBit/s VHT-MCS 8 80MHz short GI VHT-NSS 2";

    #[test]
    fn test_parse_iw_link() {
        let info = parse_iw_link(IW_LINK);
        assert_eq!(info.frequency_mhz, Some(5180));
        assert_eq!(info.width_mhz, Some(80));
    }

    #[test]
    fn test_parse_iw_link_with_fractional_frequency() {
        let info = parse_iw_link("SSID: lab\n\tfreq: 2437.0\n\trx bitrate: 72.2 MBit/s MCS 7 short GI");
        assert_eq!(info.frequency_mhz, Some(2437));
        assert_eq!(info.width_mhz, None);
    }

    #[test]
    fn test_not_connected() {
        let info = parse_iw_link("Not connected.");
        assert_eq!(info, LinkInfo::unavailable());
        assert_eq!(parse_ssid("Not connected."), None);
    }

    #[test]
    fn test_parse_ssid() {
        assert_eq!(parse_ssid(IW_LINK).as_deref(), Some("Home Network"));
    }

    #[tokio::test]
    async fn test_inspector_degrades_on_command_failure() {
        let runner = Arc::new(FakeRunner::new().fail("iw dev wlan0 link", 161, "command failed: No such device"));
        let inspector = IwLinkInspector::new(runner);
        assert_eq!(inspector.inspect("wlan0").await, LinkInfo::unavailable());
    }

    #[tokio::test]
    async fn test_inspector_reads_link() {
        let runner = Arc::new(FakeRunner::new().reply("iw dev wlp2s0 link", IW_LINK));
        let inspector = IwLinkInspector::new(runner);
        let info = inspector.inspect("wlp2s0").await;
        assert_eq!(info.frequency_display(), "5180");
        assert_eq!(info.width_display(), "80");
    }
}

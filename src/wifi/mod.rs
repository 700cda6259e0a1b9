//! Wireless interface adapters
//!
//! Each concern sits behind a trait with one adapter per privilege tier, so
//! the band controller is written once.

pub mod link;
pub mod privilege;
pub mod resolver;
pub mod switcher;

pub use link::{parse_iw_link, parse_ssid, IwLinkInspector, LinkInspector};
pub use privilege::{PrivilegeMode, PrivilegeTier, WifiAdapters};
pub use resolver::{InterfaceResolver, LinkStateResolver, NetworkManagerResolver};
pub use switcher::{BandSwitcher, HelperBandSwitcher, NmcliBandSwitcher};

//! Privilege tier detection and adapter selection

use super::resolver::{InterfaceResolver, LinkStateResolver, NetworkManagerResolver};
use super::switcher::{BandSwitcher, HelperBandSwitcher, NmcliBandSwitcher};
use crate::command::CommandRunner;
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// What the current process is allowed to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeTier {
    /// Running as root: talk to NetworkManager directly
    Elevated,
    /// Regular user: read link state, delegate band changes to the sudo helper
    Unprivileged,
}

impl PrivilegeTier {
    /// Tier of the running process, from its effective uid
    pub fn detect() -> Self {
        if effective_uid_is_root() {
            Self::Elevated
        } else {
            Self::Unprivileged
        }
    }

    pub fn has_elevated_privileges(&self) -> bool {
        matches!(self, Self::Elevated)
    }
}

impl fmt::Display for PrivilegeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elevated => f.write_str("elevated"),
            Self::Unprivileged => f.write_str("unprivileged"),
        }
    }
}

/// `--privilege` command line choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrivilegeMode {
    #[default]
    Auto,
    Elevated,
    Unprivileged,
}

impl PrivilegeMode {
    pub fn resolve(self) -> PrivilegeTier {
        match self {
            Self::Auto => PrivilegeTier::detect(),
            Self::Elevated => PrivilegeTier::Elevated,
            Self::Unprivileged => PrivilegeTier::Unprivileged,
        }
    }
}

#[cfg(unix)]
pub fn effective_uid_is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
pub fn effective_uid_is_root() -> bool {
    false
}

/// Resolver and switcher pair for one tier
pub struct WifiAdapters {
    pub tier: PrivilegeTier,
    pub resolver: Box<dyn InterfaceResolver>,
    pub switcher: Arc<dyn BandSwitcher>,
}

impl WifiAdapters {
    /// `helper` is the executable the unprivileged tier runs through `sudo -n`
    pub fn for_tier(tier: PrivilegeTier, runner: Arc<dyn CommandRunner>, helper: PathBuf) -> Self {
        match tier {
            PrivilegeTier::Elevated => Self {
                tier,
                resolver: Box::new(NetworkManagerResolver::new(runner.clone())),
                switcher: Arc::new(NmcliBandSwitcher::new(runner)),
            },
            PrivilegeTier::Unprivileged => Self {
                tier,
                resolver: Box::new(LinkStateResolver::new(runner.clone())),
                switcher: Arc::new(HelperBandSwitcher::new(runner, helper)),
            },
        }
    }
}

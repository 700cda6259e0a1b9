//! Band preference changes on the active profile

use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::types::Band;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// The privileged layer that changes a profile's band and reactivates it
#[async_trait]
pub trait BandSwitcher: Send + Sync {
    /// Set `band` on `profile` and bring the profile back up
    async fn switch_band(&self, profile: &str, band: Band) -> Result<()>;

    /// Return `profile` to automatic band selection and reactivate it
    async fn restore(&self, profile: &str) -> Result<()>;

    fn describe(&self) -> &'static str;
}

/// Calls `nmcli` directly; needs root or a polkit grant
pub struct NmcliBandSwitcher {
    runner: Arc<dyn CommandRunner>,
}

impl NmcliBandSwitcher {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn set_band(&self, profile: &str, band: Band) -> Result<()> {
        self.runner
            .run_checked("nmcli", &["connection", "modify", profile, "wifi.band", band.nmcli_value()])
            .await
            .map(|_| ())
            .map_err(|e| AppError::band_switch(format!("setting {} on '{}': {}", band, profile, e)))
    }

    async fn activate(&self, profile: &str) -> Result<()> {
        self.runner
            .run_checked("nmcli", &["connection", "up", profile])
            .await
            .map(|_| ())
            .map_err(|e| AppError::band_switch(format!("activating '{}': {}", profile, e)))
    }
}

#[async_trait]
impl BandSwitcher for NmcliBandSwitcher {
    async fn switch_band(&self, profile: &str, band: Band) -> Result<()> {
        self.set_band(profile, band).await?;
        self.activate(profile).await
    }

    async fn restore(&self, profile: &str) -> Result<()> {
        // Reactivate even if the modify step failed.
        let modified = self.set_band(profile, Band::Auto).await;
        let activated = self.activate(profile).await;
        modified.and(activated)
    }

    fn describe(&self) -> &'static str {
        "nmcli"
    }
}

/// Delegates to `wst admin` through non-interactive `sudo`
pub struct HelperBandSwitcher {
    runner: Arc<dyn CommandRunner>,
    helper: PathBuf,
}

impl HelperBandSwitcher {
    pub fn new(runner: Arc<dyn CommandRunner>, helper: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            helper: helper.into(),
        }
    }

    async fn run_helper(&self, args: &[&str]) -> Result<()> {
        let helper = self.helper.to_string_lossy();
        let mut full: Vec<&str> = vec!["-n", helper.as_ref(), "admin"];
        full.extend_from_slice(args);

        self.runner
            .run_checked("sudo", &full)
            .await
            .map(|_| ())
            .map_err(|e| AppError::band_switch(format!("admin helper: {}", e)))
    }
}

#[async_trait]
impl BandSwitcher for HelperBandSwitcher {
    async fn switch_band(&self, profile: &str, band: Band) -> Result<()> {
        self.run_helper(&["switch-band", "--conn-name", profile, "--band", band.code()]).await
    }

    async fn restore(&self, profile: &str) -> Result<()> {
        self.run_helper(&["cleanup", "--conn-name", profile]).await
    }

    fn describe(&self) -> &'static str {
        "sudo helper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeRunner;

    #[tokio::test]
    async fn test_nmcli_switch_modifies_then_activates() {
        let runner = Arc::new(
            FakeRunner::new()
                .reply("nmcli connection modify Home wifi.band a", "")
                .reply("nmcli connection up Home", "Connection successfully activated"),
        );
        let switcher = NmcliBandSwitcher::new(runner.clone());
        switcher.switch_band("Home", Band::Ghz5).await.unwrap();
        assert_eq!(
            runner.calls(),
            vec!["nmcli connection modify Home wifi.band a", "nmcli connection up Home"]
        );
    }

    #[tokio::test]
    async fn test_nmcli_switch_failure_skips_activation() {
        let runner = Arc::new(FakeRunner::new().fail("nmcli connection modify Home wifi.band 6g", 2, "invalid band"));
        let switcher = NmcliBandSwitcher::new(runner.clone());
        let err = switcher.switch_band("Home", Band::Ghz6).await.unwrap_err();
        assert!(matches!(err, AppError::BandSwitch(_)));
        assert!(!runner.was_called("nmcli connection up"));
    }

    #[tokio::test]
    async fn test_nmcli_restore_uses_empty_band_and_always_reactivates() {
        let runner = Arc::new(
            FakeRunner::new()
                .fail("nmcli connection modify Home wifi.band ", 10, "busy")
                .reply("nmcli connection up Home", ""),
        );
        let switcher = NmcliBandSwitcher::new(runner.clone());
        assert!(switcher.restore("Home").await.is_err());
        assert!(runner.was_called("nmcli connection up Home"));
    }

    #[tokio::test]
    async fn test_helper_invocation() {
        let runner = Arc::new(
            FakeRunner::new()
                .reply("sudo -n /usr/local/bin/wst admin switch-band --conn-name Home --band bg", "")
                .reply("sudo -n /usr/local/bin/wst admin cleanup --conn-name Home", ""),
        );
        let switcher = HelperBandSwitcher::new(runner.clone(), "/usr/local/bin/wst");
        switcher.switch_band("Home", Band::Ghz2_4).await.unwrap();
        switcher.restore("Home").await.unwrap();
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_helper_without_sudo_rights() {
        let runner = Arc::new(FakeRunner::new().fail(
            "sudo -n /usr/local/bin/wst admin switch-band --conn-name Home --band a",
            1,
            "sudo: a password is required",
        ));
        let switcher = HelperBandSwitcher::new(runner, "/usr/local/bin/wst");
        let err = switcher.switch_band("Home", Band::Ghz5).await.unwrap_err();
        assert!(err.to_string().contains("password is required"));
    }
}

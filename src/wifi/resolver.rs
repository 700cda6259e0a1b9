//! Active wireless interface and profile detection

use super::link::parse_ssid;
use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::models::NetworkIdentity;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Finds the wireless interface in use and the profile it is connected with
#[async_trait]
pub trait InterfaceResolver: Send + Sync {
    /// Fails with `NoInterfaceFound` or `NoActiveProfile`
    async fn resolve(&self) -> Result<NetworkIdentity>;

    /// Short name used in logs
    fn strategy(&self) -> &'static str;
}

/// Privileged strategy: asks NetworkManager for its device and connection lists
pub struct NetworkManagerResolver {
    runner: Arc<dyn CommandRunner>,
}

impl NetworkManagerResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl InterfaceResolver for NetworkManagerResolver {
    async fn resolve(&self) -> Result<NetworkIdentity> {
        let devices = self
            .runner
            .run("nmcli", &["-t", "-f", "DEVICE,TYPE", "device"])
            .await
            .unwrap_or_default();

        let interface = find_wifi_device(&devices)
            .ok_or_else(|| AppError::no_interface_found("NetworkManager reports no wifi device"))?;

        let active = self
            .runner
            .run("nmcli", &["-t", "-f", "NAME,DEVICE", "connection", "show", "--active"])
            .await
            .unwrap_or_default();

        let profile = find_active_profile(&active, &interface)
            .ok_or_else(|| AppError::no_active_profile(format!("no active connection on {}", interface)))?;

        Ok(NetworkIdentity::new(interface, profile))
    }

    fn strategy(&self) -> &'static str {
        "networkmanager"
    }
}

/// Unprivileged strategy: `/sys/class/net/*/wireless` plus `iw dev <if> link`
///
/// The SSID stands in for the profile name.
pub struct LinkStateResolver {
    runner: Arc<dyn CommandRunner>,
    sys_class_net: PathBuf,
}

impl LinkStateResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_sysfs_root(runner, crate::defaults::SYS_CLASS_NET)
    }

    pub fn with_sysfs_root(runner: Arc<dyn CommandRunner>, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            sys_class_net: root.into(),
        }
    }

    /// Interfaces exposing a `wireless` directory, sorted by name
    fn wireless_interfaces(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.sys_class_net).map_err(|e| {
            AppError::no_interface_found(format!("cannot read {}: {}", self.sys_class_net.display(), e))
        })?;

        let mut interfaces: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join("wireless").exists())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        interfaces.sort();
        Ok(interfaces)
    }
}

#[async_trait]
impl InterfaceResolver for LinkStateResolver {
    async fn resolve(&self) -> Result<NetworkIdentity> {
        let interfaces = self.wireless_interfaces()?;
        if interfaces.is_empty() {
            return Err(AppError::no_interface_found(format!(
                "no wireless interface under {}",
                self.sys_class_net.display()
            )));
        }

        for interface in &interfaces {
            let link = self.runner.run("iw", &["dev", interface, "link"]).await;
            if let Some(ssid) = link.as_deref().and_then(parse_ssid) {
                return Ok(NetworkIdentity::new(interface.clone(), ssid));
            }
        }

        Err(AppError::no_active_profile(format!(
            "{} not associated with any network",
            interfaces.join(", ")
        )))
    }

    fn strategy(&self) -> &'static str {
        "link-state"
    }
}

/// Split one line of `nmcli -t` output, honouring `\:` and `\\` escapes
pub fn split_terse_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

fn find_wifi_device(devices: &str) -> Option<String> {
    devices.lines().find_map(|line| {
        let fields = split_terse_fields(line.trim());
        match fields.as_slice() {
            [device, kind, ..] if kind == "wifi" && !device.is_empty() => Some(device.clone()),
            _ => None,
        }
    })
}

fn find_active_profile(active: &str, interface: &str) -> Option<String> {
    active.lines().find_map(|line| {
        let fields = split_terse_fields(line.trim());
        match fields.as_slice() {
            [name, device] if device == interface && !name.is_empty() => Some(name.clone()),
            _ => None,
        }
    })
}

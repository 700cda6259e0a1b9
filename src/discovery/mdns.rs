//! mDNS browsing and announcement of `_speedtest._tcp.local.`

use super::{DiscoveryEvent, NodeRegistry};
use crate::defaults::SERVICE_TYPE;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::HashMap;
use std::net::{IpAddr, UdpSocket};
use tokio::task::JoinHandle;

/// Translate a daemon event into a registry change
pub fn discovery_event(event: ServiceEvent) -> Option<DiscoveryEvent> {
    match event {
        ServiceEvent::ServiceResolved(info) => {
            let addresses = info.get_addresses();
            let ip = addresses
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| addresses.iter().next())?;
            Some(DiscoveryEvent::Added {
                name: info.get_fullname().to_string(),
                ip: ip.to_string(),
                port: info.get_port(),
            })
        }
        ServiceEvent::ServiceRemoved(_, fullname) => Some(DiscoveryEvent::Removed { name: fullname }),
        _ => None,
    }
}

/// Background browser keeping a [`NodeRegistry`] current
pub struct DiscoveryService {
    daemon: ServiceDaemon,
    task: JoinHandle<()>,
}

impl DiscoveryService {
    pub fn start(registry: NodeRegistry, logger: Logger) -> Result<Self> {
        let daemon = ServiceDaemon::new()?;
        let receiver = daemon.browse(SERVICE_TYPE)?;
        let logger = logger.named("MDNS");

        let task = tokio::spawn(async move {
            logger.info(&format!("Browsing for {}", SERVICE_TYPE)).log().await;
            while let Ok(event) = receiver.recv_async().await {
                let Some(event) = discovery_event(event) else {
                    continue;
                };
                match &event {
                    DiscoveryEvent::Added { name, ip, port } => {
                        logger.info(&format!("Discovered node {} at {}:{}", name, ip, port))
                            .field("node", name)
                            .log()
                            .await;
                    }
                    DiscoveryEvent::Removed { name } => {
                        logger.info(&format!("Node removed: {}", name))
                            .field("node", name)
                            .log()
                            .await;
                    }
                }
                registry.apply(event);
            }
        });

        Ok(Self { daemon, task })
    }

    pub fn stop(self) -> Result<()> {
        self.task.abort();
        self.daemon.shutdown()?;
        Ok(())
    }
}

/// Registration of this node's speedtest server
pub struct Announcer {
    daemon: ServiceDaemon,
    fullname: String,
}

impl Announcer {
    pub fn register(instance: &str, ip: IpAddr, port: u16) -> Result<Self> {
        let daemon = ServiceDaemon::new()?;
        let host_name = format!("{}.local.", instance);
        let mut properties = HashMap::new();
        properties.insert("path".to_string(), "/speedtest".to_string());

        let info = ServiceInfo::new(SERVICE_TYPE, instance, &host_name, ip, port, properties)?;
        let fullname = info.get_fullname().to_string();
        daemon.register(info)?;

        Ok(Self { daemon, fullname })
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    pub fn shutdown(self) -> Result<()> {
        self.daemon.unregister(&self.fullname)?;
        self.daemon.shutdown()?;
        Ok(())
    }
}

/// Address of the interface that routes to the internet
pub fn local_ip() -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(AppError::discovery("could not determine a local address to advertise"));
    }
    Ok(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(instance: &str, ip: &str, port: u16) -> ServiceInfo {
        ServiceInfo::new(
            SERVICE_TYPE,
            instance,
            &format!("{}.local.", instance),
            ip,
            port,
            HashMap::<String, String>::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_resolved_service_becomes_added_event() {
        let event = discovery_event(ServiceEvent::ServiceResolved(info("kitchen", "192.168.1.20", 8081)));
        assert_eq!(
            event,
            Some(DiscoveryEvent::Added {
                name: "kitchen._speedtest._tcp.local.".to_string(),
                ip: "192.168.1.20".to_string(),
                port: 8081,
            })
        );
    }

    #[test]
    fn test_removed_service_becomes_removed_event() {
        let event = discovery_event(ServiceEvent::ServiceRemoved(
            SERVICE_TYPE.to_string(),
            "kitchen._speedtest._tcp.local.".to_string(),
        ));
        assert_eq!(
            event,
            Some(DiscoveryEvent::Removed {
                name: "kitchen._speedtest._tcp.local.".to_string()
            })
        );
    }

    #[test]
    fn test_other_events_are_ignored() {
        assert_eq!(discovery_event(ServiceEvent::SearchStarted(SERVICE_TYPE.to_string())), None);
    }

    #[test]
    fn test_events_drive_registry() {
        let registry = NodeRegistry::new();
        let resolved = ServiceEvent::ServiceResolved(info("office", "10.0.0.7", 8081));
        registry.apply(discovery_event(resolved).unwrap());
        assert_eq!(registry.get("office._speedtest._tcp.local.").unwrap().port, 8081);

        let removed = ServiceEvent::ServiceRemoved(SERVICE_TYPE.to_string(), "office._speedtest._tcp.local.".to_string());
        registry.apply(discovery_event(removed).unwrap());
        assert!(registry.is_empty());
    }
}

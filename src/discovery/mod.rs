//! Peer node registry fed by mDNS announcements

pub mod mdns;

pub use mdns::{local_ip, Announcer, DiscoveryService};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// Status given to every node the browser resolves
pub const STATUS_DISCOVERED: &str = "discovered";

/// A speedtest node currently announced on the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(skip)]
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub status: String,
}

impl NodeRecord {
    pub fn discovered(name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            port,
            status: STATUS_DISCOVERED.to_string(),
        }
    }

    /// Base URL of the node's HTTP server
    pub fn base_url(&self) -> String {
        if self.ip.contains(':') {
            format!("http://[{}]:{}", self.ip, self.port)
        } else {
            format!("http://{}:{}", self.ip, self.port)
        }
    }
}

/// A change reported by the discovery listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Added { name: String, ip: String, port: u16 },
    Removed { name: String },
}

/// Shared set of known nodes.
///
/// Cloning shares the same map. The lock is only held for map operations.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<Mutex<HashMap<String, NodeRecord>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event; a later event for the same name replaces the earlier one
    pub fn apply(&self, event: DiscoveryEvent) {
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            DiscoveryEvent::Added { name, ip, port } => {
                let record = NodeRecord::discovered(name.clone(), ip, port);
                nodes.insert(name, record);
            }
            DiscoveryEvent::Removed { name } => {
                nodes.remove(&name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<NodeRecord> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Copy of the current set, ordered by name
    pub fn snapshot(&self) -> BTreeMap<String, NodeRecord> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

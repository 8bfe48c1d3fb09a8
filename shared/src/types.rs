use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// A healthy service instance as returned by query execution.
/// Mirrors the server's health-endpoint entry: the node, the service
/// registered on it, and every check covering either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEntry {
    pub node: Node,

    pub service: AgentService,

    #[serde(default)]
    pub checks: Vec<HealthCheck>,
}

/// Catalog node hosting a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    #[serde(rename = "ID", default)]
    pub id: String,

    /// Node name, e.g. "web-01"
    pub node: String,

    pub address: String,

    #[serde(default)]
    pub datacenter: String,

    /// Alternate addresses keyed by purpose, e.g. "lan", "wan"
    #[serde(default)]
    pub tagged_addresses: HashMap<String, String>,

    #[serde(default)]
    pub meta: HashMap<String, String>,
}

/// Service registration as seen by the agent on that node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,

    pub service: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Service address; empty means "use the node address"
    #[serde(default)]
    pub address: String,

    pub port: u16,

    #[serde(default)]
    pub meta: HashMap<String, String>,
}

/// A single health check result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    pub node: String,

    #[serde(rename = "CheckID")]
    pub check_id: String,

    pub name: String,

    /// "passing", "warning" or "critical"
    pub status: String,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub output: String,

    #[serde(rename = "ServiceID", default)]
    pub service_id: String,

    #[serde(default)]
    pub service_name: String,
}

impl ServiceEntry {
    /// Address callers should dial: the service address when registered,
    /// otherwise the node address.
    pub fn address(&self) -> &str {
        if self.service.address.is_empty() {
            &self.node.address
        } else {
            &self.service.address
        }
    }
}

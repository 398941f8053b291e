// ── Source records ──
//
// Raw per-device data as a source reports it. Vendor adapters produce these;
// the only adapter shipped here reads them from a JSON snapshot file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Everything one source reported in a single pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSnapshot {
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

impl SourceSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let snapshot_error = |reason: String| CoreError::Snapshot {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        Self::from_json(&raw).map_err(|e| snapshot_error(e.to_string()))
    }

    pub fn interface_count(&self) -> usize {
        self.devices.iter().map(DeviceRecord::interface_count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceRecord {
    /// The source's native identifier.
    pub id: String,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub serial: String,
    pub os_name: String,
    pub os_version: String,
    pub description: String,
    pub cpu_cores: Option<u32>,
    pub memory_mb: Option<u64>,
    pub physical_interfaces: Vec<InterfaceRecord>,
    pub vlan_interfaces: Vec<VlanInterfaceRecord>,
    pub ether_channel_interfaces: Vec<InterfaceRecord>,
    pub sub_interfaces: Vec<SubInterfaceRecord>,
}

impl DeviceRecord {
    pub fn interface_count(&self) -> usize {
        self.physical_interfaces.len()
            + self.vlan_interfaces.len()
            + self.ether_channel_interfaces.len()
            + self.sub_interfaces.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub mtu: Option<u32>,
    pub ipv4: Option<InterfaceIpv4>,
    pub dns_name: String,
}

impl Default for InterfaceRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            enabled: true,
            mtu: None,
            ipv4: None,
            dns_name: String::new(),
        }
    }
}

/// IPv4 configuration of an interface. Static wins over DHCP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceIpv4 {
    #[serde(rename = "static")]
    pub static_address: Option<AddressAssignment>,
    pub dhcp: Option<AddressAssignment>,
}

impl InterfaceIpv4 {
    pub fn effective(&self) -> Option<&AddressAssignment> {
        usable(self.static_address.as_ref()).or_else(|| usable(self.dhcp.as_ref()))
    }

    /// True when the effective address was leased rather than configured.
    pub fn is_dhcp(&self) -> bool {
        usable(self.static_address.as_ref()).is_none() && usable(self.dhcp.as_ref()).is_some()
    }
}

fn usable(assignment: Option<&AddressAssignment>) -> Option<&AddressAssignment> {
    assignment.filter(|a| !a.address.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAssignment {
    pub address: String,
    /// Dotted quad (`255.255.255.0`) or bit count (`24`).
    pub netmask: String,
}

/// SVI: a routed interface bound to one VLAN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VlanInterfaceRecord {
    #[serde(flatten)]
    pub interface: InterfaceRecord,
    #[serde(default)]
    pub vid: u16,
}

/// 802.1Q sub-interface of a physical or ether-channel parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubInterfaceRecord {
    #[serde(flatten)]
    pub interface: InterfaceRecord,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub vlan_id: u16,
}

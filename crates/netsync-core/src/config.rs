// ── Runtime source policy ──
//
// These types describe *how* records from one source are reconciled:
// relation rules, subnet filters and fallbacks. They are fully validated
// and compiled; the config crate builds them from TOML and hands them in.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::matcher::RegexRelations;
use crate::util::is_permitted_address;

/// Ordered relation rules per resolution kind.
#[derive(Debug, Clone, Default)]
pub struct RelationRules {
    pub host_tenant: RegexRelations,
    pub host_role: RegexRelations,
    pub host_site: RegexRelations,
    pub vlan_site: RegexRelations,
    pub vlan_group: RegexRelations,
    /// Group name → site the group is scoped to.
    pub vlan_group_site: RegexRelations,
    pub vlan_tenant: RegexRelations,
}

/// Role given to devices that no host-role rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DefaultRole {
    #[default]
    Firewall,
    Server,
    Switch,
}

impl DefaultRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::Firewall => "Firewall",
            Self::Server => "Server",
            Self::Switch => "Switch",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Firewall => "f44336",
            Self::Server => "2196f3",
            Self::Switch => "4caf50",
        }
    }
}

/// Compiled reconciliation policy for one source.
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    /// Unique source name, stamped on every object it creates.
    pub name: String,
    pub default_role: DefaultRole,
    /// Manufacturer used when a device record does not name one.
    pub manufacturer: Option<String>,
    pub ignore_serial_numbers: bool,
    /// Site for hosts and VLANs that no site rule matches.
    pub default_site: Option<String>,
    pub permitted_subnets: Vec<IpNetwork>,
    pub ignored_subnets: Vec<IpNetwork>,
    pub relations: RelationRules,
}

impl SourcePolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_role: DefaultRole::default(),
            manufacturer: None,
            ignore_serial_numbers: false,
            default_site: None,
            permitted_subnets: Vec::new(),
            ignored_subnets: Vec::new(),
            relations: RelationRules::default(),
        }
    }

    /// Tags stamped on objects created from this source.
    pub fn source_tags(&self) -> [String; 1] {
        [format!("source:{}", self.name)]
    }

    pub fn is_permitted(&self, addr: IpAddr) -> bool {
        is_permitted_address(addr, &self.permitted_subnets, &self.ignored_subnets)
    }
}

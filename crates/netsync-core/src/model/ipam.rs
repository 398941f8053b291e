// ── IPAM domain types ──

use std::sync::Arc;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use strum::Display;

use super::common::{ObjectMeta, composite_key, merge_option, merge_string};
use super::dcim::{Interface, Site};
use super::object::same_opt_ref;
use super::supporting::Tenant;

/// Lowest and highest assignable 802.1Q VLAN IDs.
pub const MIN_VID: u16 = 1;
pub const MAX_VID: u16 = 4094;

#[derive(Debug, Clone)]
pub struct VlanGroup {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
    /// Scope of the group; `None` means global.
    pub site: Option<Arc<Site>>,
    pub min_vid: u16,
    pub max_vid: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VlanStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
}

#[derive(Debug, Clone)]
pub struct Vlan {
    pub meta: ObjectMeta,
    pub name: String,
    pub vid: u16,
    pub status: VlanStatus,
    pub site: Option<Arc<Site>>,
    pub group: Option<Arc<VlanGroup>>,
    pub tenant: Option<Arc<Tenant>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IpAddressStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
    Dhcp,
}

#[derive(Debug, Clone)]
pub struct IpAddress {
    pub meta: ObjectMeta,
    /// Host address with its mask, e.g. `10.0.0.5/24`.
    pub address: IpNetwork,
    pub dns_name: String,
    pub status: IpAddressStatus,
    pub assigned_interface: Option<Arc<Interface>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrefixStatus {
    #[default]
    Active,
    Container,
    Reserved,
    Deprecated,
}

#[derive(Debug, Clone)]
pub struct Prefix {
    pub meta: ObjectMeta,
    /// Network address with its mask, e.g. `10.0.0.0/24`.
    pub prefix: IpNetwork,
    pub status: PrefixStatus,
    pub tenant: Option<Arc<Tenant>>,
    pub vlan: Option<Arc<Vlan>>,
}

// ── Change detection ────────────────────────────────────────────────

impl PartialEq for VlanGroup {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.name == other.name
            && self.slug == other.slug
            && self.min_vid == other.min_vid
            && self.max_vid == other.max_vid
            && same_opt_ref(self.site.as_ref(), other.site.as_ref())
    }
}

impl PartialEq for Vlan {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.name == other.name
            && self.vid == other.vid
            && self.status == other.status
            && same_opt_ref(self.site.as_ref(), other.site.as_ref())
            && same_opt_ref(self.group.as_ref(), other.group.as_ref())
            && same_opt_ref(self.tenant.as_ref(), other.tenant.as_ref())
    }
}

impl PartialEq for IpAddress {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.address == other.address
            && self.dns_name == other.dns_name
            && self.status == other.status
            && same_opt_ref(self.assigned_interface.as_ref(), other.assigned_interface.as_ref())
    }
}

impl PartialEq for Prefix {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.prefix == other.prefix
            && self.status == other.status
            && same_opt_ref(self.tenant.as_ref(), other.tenant.as_ref())
            && same_opt_ref(self.vlan.as_ref(), other.vlan.as_ref())
    }
}

// ── Natural keys and merge rules ────────────────────────────────────

fn site_name(site: Option<&Arc<Site>>) -> &str {
    site.map_or("", |s| s.name.as_str())
}

impl VlanGroup {
    pub fn key(&self) -> String {
        composite_key(&[&self.name, site_name(self.site.as_ref())])
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
        self.min_vid = candidate.min_vid;
        self.max_vid = candidate.max_vid;
    }
}

impl Vlan {
    pub fn key(&self) -> String {
        composite_key(&[&self.name, site_name(self.site.as_ref())])
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        if candidate.vid != 0 {
            self.vid = candidate.vid;
        }
        self.status = candidate.status;
        merge_option(&mut self.group, candidate.group);
        merge_option(&mut self.tenant, candidate.tenant);
    }
}

impl IpAddress {
    pub fn key(&self) -> String {
        let address = self.address.to_string();
        match &self.assigned_interface {
            Some(iface) => composite_key(&[&iface.key(), &address]),
            None => address,
        }
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.dns_name, candidate.dns_name);
        self.status = candidate.status;
        merge_option(&mut self.assigned_interface, candidate.assigned_interface);
    }
}

impl Prefix {
    pub fn key(&self) -> String {
        self.prefix.to_string()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        self.status = candidate.status;
        merge_option(&mut self.tenant, candidate.tenant);
        merge_option(&mut self.vlan, candidate.vlan);
    }
}

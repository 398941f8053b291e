// ── DCIM domain types ──

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::common::{ObjectMeta, composite_key, merge_option, merge_string, merge_vec};
use super::ipam::Vlan;
use super::object::{same_opt_ref, same_ref, same_refs};
use super::supporting::Tenant;

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manufacturer {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
}

/// Operating system / firmware, e.g. "FXOS 7.2.5".
#[derive(Debug, Clone)]
pub struct Platform {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
    pub manufacturer: Option<Arc<Manufacturer>>,
}

#[derive(Debug, Clone)]
pub struct DeviceType {
    pub meta: ObjectMeta,
    pub manufacturer: Arc<Manufacturer>,
    pub model: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRole {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
    /// Hex colour without the leading `#`.
    pub color: String,
    pub vm_role: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Active,
    Offline,
    Planned,
    Staged,
    Failed,
    Inventory,
    Decommissioning,
}

#[derive(Debug, Clone)]
pub struct Device {
    pub meta: ObjectMeta,
    pub name: String,
    pub role: Arc<DeviceRole>,
    pub device_type: Arc<DeviceType>,
    pub site: Option<Arc<Site>>,
    pub tenant: Option<Arc<Tenant>>,
    pub platform: Option<Arc<Platform>>,
    pub serial: String,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterfaceType {
    /// Physical port of unknown media.
    Other,
    /// SVI or sub-interface.
    Virtual,
    /// Link aggregation (ether-channel / port-channel).
    Lag,
}

#[derive(Debug, Clone)]
pub struct Interface {
    pub meta: ObjectMeta,
    pub device: Arc<Device>,
    pub name: String,
    pub interface_type: InterfaceType,
    pub enabled: bool,
    pub mtu: Option<u32>,
    pub parent: Option<Arc<Interface>>,
    pub tagged_vlans: Vec<Arc<Vlan>>,
}

// ── Change detection ────────────────────────────────────────────────

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.name == other.name
            && self.slug == other.slug
            && same_opt_ref(self.manufacturer.as_ref(), other.manufacturer.as_ref())
    }
}

impl PartialEq for DeviceType {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.model == other.model
            && self.slug == other.slug
            && same_ref(&self.manufacturer, &other.manufacturer)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.name == other.name
            && self.serial == other.serial
            && self.status == other.status
            && same_ref(&self.role, &other.role)
            && same_ref(&self.device_type, &other.device_type)
            && same_opt_ref(self.site.as_ref(), other.site.as_ref())
            && same_opt_ref(self.tenant.as_ref(), other.tenant.as_ref())
            && same_opt_ref(self.platform.as_ref(), other.platform.as_ref())
    }
}

impl PartialEq for Interface {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.name == other.name
            && self.interface_type == other.interface_type
            && self.enabled == other.enabled
            && self.mtu == other.mtu
            && same_ref(&self.device, &other.device)
            && same_opt_ref(self.parent.as_ref(), other.parent.as_ref())
            && same_refs(&self.tagged_vlans, &other.tagged_vlans)
    }
}

// ── Natural keys and merge rules ────────────────────────────────────

impl Site {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
    }
}

impl Manufacturer {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
    }
}

impl Platform {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
        merge_option(&mut self.manufacturer, candidate.manufacturer);
    }
}

impl DeviceType {
    pub fn key(&self) -> String {
        composite_key(&[&self.manufacturer.name, &self.model])
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
        self.manufacturer = candidate.manufacturer;
    }
}

impl DeviceRole {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
        merge_string(&mut self.color, candidate.color);
        self.vm_role = candidate.vm_role;
    }
}

impl Device {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        self.role = candidate.role;
        self.device_type = candidate.device_type;
        merge_option(&mut self.site, candidate.site);
        merge_option(&mut self.tenant, candidate.tenant);
        merge_option(&mut self.platform, candidate.platform);
        merge_string(&mut self.serial, candidate.serial);
        self.status = candidate.status;
    }
}

impl Interface {
    pub fn key(&self) -> String {
        composite_key(&[&self.device.name, &self.name])
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        self.device = candidate.device;
        self.interface_type = candidate.interface_type;
        self.enabled = candidate.enabled;
        merge_option(&mut self.mtu, candidate.mtu);
        merge_option(&mut self.parent, candidate.parent);
        merge_vec(&mut self.tagged_vlans, candidate.tagged_vlans);
    }
}

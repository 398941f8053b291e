// ── Interface topology assembly ──
//
// Builds one device's interfaces in four fixed stages:
//
//   1. physical        type other, address, no prefix
//   2. VLAN (SVI)      VLAN object, type virtual, address and prefix
//   3. ether-channel   type LAG, address, no prefix
//   4. sub-interface   VLAN object, parent by name, address and prefix
//
// Only stages 1-3 fill the per-device name map. Sub-interfaces run last
// and resolve their parent from it, so a sub-interface never parents
// another one.

use std::collections::HashMap;
use std::sync::Arc;

use ipnetwork::IpNetwork;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SourcePolicy;
use crate::error::CoreError;
use crate::model::{
    CUSTOM_FIELD_ARP_ENTRY, CUSTOM_FIELD_SOURCE, CUSTOM_FIELD_SOURCE_ID, Device, Interface,
    InterfaceType, IpAddress, IpAddressStatus, ObjectMeta, Prefix, PrefixStatus, Vlan, VlanStatus,
};
use crate::resolver::RelationResolver;
use crate::source::{AddressAssignment, DeviceRecord, InterfaceRecord, SubInterfaceRecord, VlanInterfaceRecord};
use crate::store::Inventory;
use crate::util::{network_of, prefix_len_from_mask};

/// What one device's assembly produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopologyReport {
    pub interfaces: usize,
    pub vlans: usize,
    pub ip_addresses: usize,
    pub prefixes: usize,
    /// Interface records dropped for having no name.
    pub skipped_interfaces: usize,
    /// Addresses rejected by the subnet filter or unparsable.
    pub filtered_addresses: usize,
}

impl TopologyReport {
    pub fn absorb(&mut self, other: Self) {
        self.interfaces += other.interfaces;
        self.vlans += other.vlans;
        self.ip_addresses += other.ip_addresses;
        self.prefixes += other.prefixes;
        self.skipped_interfaces += other.skipped_interfaces;
        self.filtered_addresses += other.filtered_addresses;
    }
}

/// Whether an interface's address also yields its enclosing prefix.
#[derive(Debug, Clone, Copy)]
enum PrefixDerivation<'v> {
    Never,
    /// Derive the prefix; it inherits this VLAN and the VLAN's tenant.
    WithVlan(Option<&'v Arc<Vlan>>),
}

/// Assembles the interfaces of a single device.
pub struct TopologyAssembler<'a> {
    inventory: &'a Inventory,
    policy: &'a SourcePolicy,
    resolver: RelationResolver<'a>,
    device: Arc<Device>,
    by_name: HashMap<String, Arc<Interface>>,
    report: TopologyReport,
}

impl<'a> TopologyAssembler<'a> {
    pub fn new(inventory: &'a Inventory, policy: &'a SourcePolicy, device: Arc<Device>) -> Self {
        Self {
            inventory,
            policy,
            resolver: RelationResolver::new(inventory, policy),
            device,
            by_name: HashMap::new(),
            report: TopologyReport::default(),
        }
    }

    /// Run all four stages. A hard error aborts the device.
    pub async fn assemble(mut self, record: &DeviceRecord) -> Result<TopologyReport, CoreError> {
        for iface in &record.physical_interfaces {
            self.physical(iface, InterfaceType::Other).await?;
        }
        for svi in &record.vlan_interfaces {
            self.vlan_interface(svi).await?;
        }
        for lag in &record.ether_channel_interfaces {
            self.physical(lag, InterfaceType::Lag).await?;
        }
        for sub in &record.sub_interfaces {
            self.sub_interface(sub).await?;
        }
        Ok(self.report)
    }

    // ── Stages ───────────────────────────────────────────────────────

    async fn physical(&mut self, record: &InterfaceRecord, kind: InterfaceType) -> Result<(), CoreError> {
        let Some(iface) = self.interface(record, kind, None, Vec::new()).await? else {
            return Ok(());
        };
        self.by_name.insert(record.name.clone(), Arc::clone(&iface));
        self.address(record, &iface, PrefixDerivation::Never).await
    }

    async fn vlan_interface(&mut self, svi: &VlanInterfaceRecord) -> Result<(), CoreError> {
        let record = &svi.interface;
        if record.name.is_empty() {
            self.skip(record);
            return Ok(());
        }
        let vlan = if svi.vid == 0 {
            None
        } else {
            Some(self.vlan(record, svi.vid).await?)
        };

        let tagged = vlan.iter().cloned().collect();
        let Some(iface) = self.interface(record, InterfaceType::Virtual, None, tagged).await? else {
            return Ok(());
        };
        self.by_name.insert(record.name.clone(), Arc::clone(&iface));
        self.address(record, &iface, PrefixDerivation::WithVlan(vlan.as_ref())).await
    }

    async fn sub_interface(&mut self, sub: &SubInterfaceRecord) -> Result<(), CoreError> {
        let record = &sub.interface;
        if record.name.is_empty() {
            self.skip(record);
            return Ok(());
        }
        let vlan = if sub.vlan_id > 1 {
            Some(self.vlan(record, sub.vlan_id).await?)
        } else {
            None
        };

        let parent = self.by_name.get(&sub.parent_name).cloned();
        if parent.is_none() {
            debug!(
                device = %self.device.name,
                interface = %record.name,
                parent = %sub.parent_name,
                "sub-interface parent not found"
            );
        }

        let tagged = vlan.iter().cloned().collect();
        let Some(iface) = self.interface(record, InterfaceType::Virtual, parent, tagged).await? else {
            return Ok(());
        };
        self.address(record, &iface, PrefixDerivation::WithVlan(vlan.as_ref())).await
    }

    // ── Building blocks ──────────────────────────────────────────────

    fn skip(&mut self, record: &InterfaceRecord) {
        warn!(
            device = %self.device.name,
            source_id = %record.id,
            "interface record without a name skipped"
        );
        self.report.skipped_interfaces += 1;
    }

    fn source_meta(&self) -> ObjectMeta {
        ObjectMeta::with_tags(self.policy.source_tags())
    }

    async fn interface(
        &mut self,
        record: &InterfaceRecord,
        interface_type: InterfaceType,
        parent: Option<Arc<Interface>>,
        tagged_vlans: Vec<Arc<Vlan>>,
    ) -> Result<Option<Arc<Interface>>, CoreError> {
        if record.name.is_empty() {
            self.skip(record);
            return Ok(None);
        }

        let iface = self
            .inventory
            .add_interface(Interface {
                meta: self
                    .source_meta()
                    .description(record.description.as_str())
                    .custom_field(CUSTOM_FIELD_SOURCE_ID, record.id.as_str())
                    .custom_field(CUSTOM_FIELD_SOURCE, self.policy.name.as_str()),
                device: Arc::clone(&self.device),
                name: record.name.clone(),
                interface_type,
                enabled: record.enabled,
                mtu: record.mtu,
                parent,
                tagged_vlans,
            })
            .await?;

        self.report.interfaces += 1;
        Ok(Some(iface))
    }

    /// VLAN named after the interface, with site, group and tenant resolved
    /// from the interface name.
    async fn vlan(&mut self, record: &InterfaceRecord, vid: u16) -> Result<Arc<Vlan>, CoreError> {
        let site = self.resolver.vlan_site(&record.name).await?;
        let group = self.resolver.vlan_group(&record.name, site.as_ref()).await?;
        let tenant = self.resolver.vlan_tenant(&record.name).await?;

        let vlan = self
            .inventory
            .add_vlan(Vlan {
                meta: self.source_meta().description(record.description.as_str()),
                name: record.name.clone(),
                vid,
                status: VlanStatus::Active,
                site,
                group,
                tenant,
            })
            .await?;
        self.report.vlans += 1;
        Ok(vlan)
    }

    /// Address of the interface, if it has one the subnet filter admits.
    async fn address(
        &mut self,
        record: &InterfaceRecord,
        iface: &Arc<Interface>,
        prefix: PrefixDerivation<'_>,
    ) -> Result<(), CoreError> {
        let Some(ipv4) = record.ipv4.as_ref() else {
            return Ok(());
        };
        let Some(assignment) = ipv4.effective() else {
            return Ok(());
        };

        let address = match interface_address(assignment) {
            Ok(address) => address,
            Err(e) => {
                warn!(device = %self.device.name, interface = %record.name, error = %e, "unusable interface address");
                self.report.filtered_addresses += 1;
                return Ok(());
            }
        };
        if !self.policy.is_permitted(address.ip()) {
            debug!(interface = %record.name, %address, "address outside permitted subnets");
            self.report.filtered_addresses += 1;
            return Ok(());
        }

        self.inventory
            .add_ip_address(IpAddress {
                meta: self.source_meta().custom_field(CUSTOM_FIELD_ARP_ENTRY, false),
                address,
                dns_name: record.dns_name.clone(),
                status: if ipv4.is_dhcp() {
                    IpAddressStatus::Dhcp
                } else {
                    IpAddressStatus::Active
                },
                assigned_interface: Some(Arc::clone(iface)),
            })
            .await?;
        self.report.ip_addresses += 1;

        let PrefixDerivation::WithVlan(vlan) = prefix else {
            return Ok(());
        };
        let Some(network) = network_of(address) else {
            return Ok(());
        };
        self.inventory
            .add_prefix(Prefix {
                meta: self.source_meta(),
                prefix: network,
                status: PrefixStatus::Active,
                tenant: vlan.and_then(|v| v.tenant.clone()),
                vlan: vlan.cloned(),
            })
            .await?;
        self.report.prefixes += 1;
        Ok(())
    }
}

/// `address/len` from an address and a netmask in either notation.
pub fn interface_address(assignment: &AddressAssignment) -> Result<IpNetwork, CoreError> {
    let invalid = |reason: &str| CoreError::InvalidAddress {
        address: format!("{}/{}", assignment.address, assignment.netmask),
        reason: reason.to_owned(),
    };
    let ip = assignment
        .address
        .trim()
        .parse()
        .map_err(|_| invalid("not an IP address"))?;
    let len = prefix_len_from_mask(&assignment.netmask).ok_or_else(|| invalid("bad netmask"))?;
    IpNetwork::new(ip, len).map_err(|e| invalid(&e.to_string()))
}

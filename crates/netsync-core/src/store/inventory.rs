// ── Inventory: the per-run object index ──
//
// One `ObjectIndex` per kind, a handle to the destination, the orphan
// tracker and per-kind change counters. Every `add_*` call goes through
// `upsert`, which is the only place objects are created or patched.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use super::collection::{ErasedIndex, ObjectIndex};
use crate::config::DefaultRole;
use crate::destination::Destination;
use crate::error::CoreError;
use crate::model::common::composite_key;
use crate::model::{
    AnyObject, CUSTOM_FIELD_ARP_ENTRY, CUSTOM_FIELD_DEVICE_UUID, CUSTOM_FIELD_HOST_CPU_CORES,
    CUSTOM_FIELD_HOST_MEMORY, CUSTOM_FIELD_SOURCE, CUSTOM_FIELD_SOURCE_ID, Cluster, ClusterGroup,
    ClusterType, CustomField, CustomFieldType, Device, DeviceRole, DeviceType, Interface,
    InventoryObject, IpAddress, Manufacturer, ObjectKind, ObjectMeta, Platform, Prefix, RemoteId,
    Site, Tenant, Vlan, VlanGroup,
};
use crate::orphan::{OrphanManager, PruneReport};
use crate::util::slugify;

/// Per-kind write counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ChangeSummary {
    pub fn total_writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

/// Indexed view of the destination inventory for one reconciliation run.
///
/// Built with [`Inventory::new`], seeded with [`Inventory::load`], filled
/// by source passes and finished with [`Inventory::prune_orphans`].
pub struct Inventory {
    destination: Arc<dyn Destination>,
    /// Tag marking objects as owned by this system.
    tag: String,
    orphans: OrphanManager,
    changes: DashMap<ObjectKind, ChangeSummary>,

    sites: ObjectIndex<Site>,
    manufacturers: ObjectIndex<Manufacturer>,
    platforms: ObjectIndex<Platform>,
    device_types: ObjectIndex<DeviceType>,
    device_roles: ObjectIndex<DeviceRole>,
    tenants: ObjectIndex<Tenant>,
    devices: ObjectIndex<Device>,
    vlan_groups: ObjectIndex<VlanGroup>,
    vlans: ObjectIndex<Vlan>,
    interfaces: ObjectIndex<Interface>,
    ip_addresses: ObjectIndex<IpAddress>,
    prefixes: ObjectIndex<Prefix>,
    cluster_types: ObjectIndex<ClusterType>,
    cluster_groups: ObjectIndex<ClusterGroup>,
    clusters: ObjectIndex<Cluster>,
    custom_fields: ObjectIndex<CustomField>,
}

impl Inventory {
    pub fn new(destination: Arc<dyn Destination>, tag: impl Into<String>) -> Self {
        Self {
            destination,
            tag: tag.into(),
            orphans: OrphanManager::new(),
            changes: DashMap::new(),
            sites: ObjectIndex::new(),
            manufacturers: ObjectIndex::new(),
            platforms: ObjectIndex::new(),
            device_types: ObjectIndex::new(),
            device_roles: ObjectIndex::new(),
            tenants: ObjectIndex::new(),
            devices: ObjectIndex::new(),
            vlan_groups: ObjectIndex::new(),
            vlans: ObjectIndex::new(),
            interfaces: ObjectIndex::new(),
            ip_addresses: ObjectIndex::new(),
            prefixes: ObjectIndex::new(),
            cluster_types: ObjectIndex::new(),
            cluster_groups: ObjectIndex::new(),
            clusters: ObjectIndex::new(),
            custom_fields: ObjectIndex::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn orphans(&self) -> &OrphanManager {
        &self.orphans
    }

    // ── Bootstrap ────────────────────────────────────────────────────

    /// Seed every index from the destination's existing objects.
    ///
    /// Objects carrying the ownership tag are registered as managed, so
    /// anything they are not re-reported for becomes an orphan. Presence
    /// and change counters from an earlier run on this inventory are reset.
    pub async fn load(&self) -> Result<(), CoreError> {
        self.orphans.reset_presence();
        self.changes.clear();

        let mut total = 0;
        for kind in ObjectKind::load_order() {
            let objects = self
                .destination
                .list(kind)
                .await
                .map_err(|e| CoreError::destination(kind, "*", e))?;

            let index = self.index(kind);
            let mut owned = 0;
            for object in objects {
                let id = object.meta().id;
                let is_ours = object.meta().has_tag(&self.tag);
                index.insert_any(object)?;
                if let (true, Some(id)) = (is_ours, id) {
                    self.orphans.register(kind, id);
                    owned += 1;
                }
            }
            total += index.count();
            debug!(%kind, count = index.count(), owned, "loaded existing objects");
        }
        info!(objects = total, tag = %self.tag, "inventory loaded");
        Ok(())
    }

    /// Create the custom-field definitions every source relies on.
    pub async fn ensure_custom_fields(&self) -> Result<(), CoreError> {
        let traced = vec![
            ObjectKind::Device,
            ObjectKind::Interface,
            ObjectKind::IpAddress,
            ObjectKind::Prefix,
            ObjectKind::Vlan,
        ];
        let definitions = [
            (CUSTOM_FIELD_SOURCE, "Source", CustomFieldType::Text, traced.clone()),
            (CUSTOM_FIELD_SOURCE_ID, "Source ID", CustomFieldType::Text, traced),
            (CUSTOM_FIELD_HOST_CPU_CORES, "Host CPU cores", CustomFieldType::Text, vec![ObjectKind::Device]),
            (CUSTOM_FIELD_HOST_MEMORY, "Host memory", CustomFieldType::Text, vec![ObjectKind::Device]),
            (CUSTOM_FIELD_ARP_ENTRY, "ARP entry", CustomFieldType::Boolean, vec![ObjectKind::IpAddress]),
            (CUSTOM_FIELD_DEVICE_UUID, "Device UUID", CustomFieldType::Text, vec![ObjectKind::Device]),
        ];

        for (name, label, field_type, object_kinds) in definitions {
            self.add_custom_field(CustomField {
                meta: ObjectMeta::default(),
                name: name.to_owned(),
                label: label.to_owned(),
                field_type,
                object_kinds,
            })
            .await?;
        }
        Ok(())
    }

    // ── Upsert protocol ──────────────────────────────────────────────

    /// Find-or-create-or-update one object under its kind's write gate.
    async fn upsert<T: InventoryObject>(
        &self,
        index: &ObjectIndex<T>,
        mut candidate: T,
    ) -> Result<Arc<T>, CoreError> {
        candidate.meta_mut().tags.insert(self.tag.clone());
        let key = candidate.key();
        let _gate = index.lock().await;

        let Some(existing) = index.get_by_key(&key) else {
            let id = self
                .destination
                .create(&candidate.to_any())
                .await
                .map_err(|e| CoreError::destination(T::KIND, &key, e))?;
            candidate.meta_mut().id = Some(id);
            let created = Arc::new(candidate);
            index.insert(key.clone(), Arc::clone(&created));
            self.claim(T::KIND, id);
            self.count(T::KIND, Change::Created);
            debug!(kind = %T::KIND, %key, %id, "created");
            return Ok(created);
        };

        let mut merged = T::clone(&existing);
        merged.merge(candidate);
        let Some(id) = merged.meta().id else {
            return Err(CoreError::Internal(format!(
                "indexed {} '{key}' has no remote id",
                T::KIND
            )));
        };

        if merged == *existing {
            self.claim(T::KIND, id);
            self.count(T::KIND, Change::Unchanged);
            return Ok(existing);
        }

        self.destination
            .update(id, &merged.to_any())
            .await
            .map_err(|e| CoreError::destination(T::KIND, &key, e))?;
        let updated = Arc::new(merged);
        index.insert(key.clone(), Arc::clone(&updated));
        self.claim(T::KIND, id);
        self.count(T::KIND, Change::Updated);
        debug!(kind = %T::KIND, %key, %id, "updated");
        Ok(updated)
    }

    fn claim(&self, kind: ObjectKind, id: RemoteId) {
        self.orphans.register(kind, id);
        self.orphans.mark_present(kind, id);
    }

    fn count(&self, kind: ObjectKind, change: Change) {
        let mut summary = self.changes.entry(kind).or_default();
        match change {
            Change::Created => summary.created += 1,
            Change::Updated => summary.updated += 1,
            Change::Unchanged => summary.unchanged += 1,
            Change::Deleted => summary.deleted += 1,
        }
    }

    // ── Add operations ───────────────────────────────────────────────

    pub async fn add_site(&self, site: Site) -> Result<Arc<Site>, CoreError> {
        self.upsert(&self.sites, site).await
    }

    pub async fn add_manufacturer(&self, manufacturer: Manufacturer) -> Result<Arc<Manufacturer>, CoreError> {
        self.upsert(&self.manufacturers, manufacturer).await
    }

    pub async fn add_platform(&self, platform: Platform) -> Result<Arc<Platform>, CoreError> {
        self.upsert(&self.platforms, platform).await
    }

    pub async fn add_device_type(&self, device_type: DeviceType) -> Result<Arc<DeviceType>, CoreError> {
        self.upsert(&self.device_types, device_type).await
    }

    pub async fn add_device_role(&self, role: DeviceRole) -> Result<Arc<DeviceRole>, CoreError> {
        self.upsert(&self.device_roles, role).await
    }

    /// Get-or-create the role given to hosts no role rule matches.
    pub async fn add_default_device_role(&self, role: DefaultRole) -> Result<Arc<DeviceRole>, CoreError> {
        self.add_device_role(DeviceRole {
            meta: ObjectMeta::default(),
            name: role.name().to_owned(),
            slug: slugify(role.name()),
            color: role.color().to_owned(),
            vm_role: false,
        })
        .await
    }

    pub async fn add_tenant(&self, tenant: Tenant) -> Result<Arc<Tenant>, CoreError> {
        self.upsert(&self.tenants, tenant).await
    }

    pub async fn add_device(&self, device: Device) -> Result<Arc<Device>, CoreError> {
        self.upsert(&self.devices, device).await
    }

    pub async fn add_vlan_group(&self, group: VlanGroup) -> Result<Arc<VlanGroup>, CoreError> {
        self.upsert(&self.vlan_groups, group).await
    }

    pub async fn add_vlan(&self, vlan: Vlan) -> Result<Arc<Vlan>, CoreError> {
        self.upsert(&self.vlans, vlan).await
    }

    pub async fn add_interface(&self, interface: Interface) -> Result<Arc<Interface>, CoreError> {
        self.upsert(&self.interfaces, interface).await
    }

    pub async fn add_ip_address(&self, address: IpAddress) -> Result<Arc<IpAddress>, CoreError> {
        self.upsert(&self.ip_addresses, address).await
    }

    pub async fn add_prefix(&self, prefix: Prefix) -> Result<Arc<Prefix>, CoreError> {
        self.upsert(&self.prefixes, prefix).await
    }

    pub async fn add_cluster_type(&self, cluster_type: ClusterType) -> Result<Arc<ClusterType>, CoreError> {
        self.upsert(&self.cluster_types, cluster_type).await
    }

    pub async fn add_cluster_group(&self, group: ClusterGroup) -> Result<Arc<ClusterGroup>, CoreError> {
        self.upsert(&self.cluster_groups, group).await
    }

    pub async fn add_cluster(&self, cluster: Cluster) -> Result<Arc<Cluster>, CoreError> {
        self.upsert(&self.clusters, cluster).await
    }

    pub async fn add_custom_field(&self, field: CustomField) -> Result<Arc<CustomField>, CoreError> {
        self.upsert(&self.custom_fields, field).await
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn get_site(&self, name: &str) -> Option<Arc<Site>> {
        self.sites.get_by_key(name)
    }

    pub fn get_manufacturer(&self, name: &str) -> Option<Arc<Manufacturer>> {
        self.manufacturers.get_by_key(name)
    }

    pub fn get_platform(&self, name: &str) -> Option<Arc<Platform>> {
        self.platforms.get_by_key(name)
    }

    pub fn get_device_type(&self, manufacturer: &str, model: &str) -> Option<Arc<DeviceType>> {
        self.device_types.get_by_key(&composite_key(&[manufacturer, model]))
    }

    pub fn get_device_role(&self, name: &str) -> Option<Arc<DeviceRole>> {
        self.device_roles.get_by_key(name)
    }

    pub fn get_tenant(&self, name: &str) -> Option<Arc<Tenant>> {
        self.tenants.get_by_key(name)
    }

    pub fn get_device(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.get_by_key(name)
    }

    pub fn get_vlan_group(&self, name: &str, site: Option<&str>) -> Option<Arc<VlanGroup>> {
        self.vlan_groups
            .get_by_key(&composite_key(&[name, site.unwrap_or_default()]))
    }

    pub fn get_vlan(&self, name: &str, site: Option<&str>) -> Option<Arc<Vlan>> {
        self.vlans
            .get_by_key(&composite_key(&[name, site.unwrap_or_default()]))
    }

    pub fn get_interface(&self, device: &str, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.get_by_key(&composite_key(&[device, name]))
    }

    /// Address assigned to `device`/`interface`, given in CIDR form.
    pub fn get_ip_address(&self, device: &str, interface: &str, address: &str) -> Option<Arc<IpAddress>> {
        self.ip_addresses
            .get_by_key(&composite_key(&[device, interface, address]))
    }

    pub fn get_prefix(&self, cidr: &str) -> Option<Arc<Prefix>> {
        self.prefixes.get_by_key(cidr)
    }

    pub fn get_cluster(&self, name: &str) -> Option<Arc<Cluster>> {
        self.clusters.get_by_key(name)
    }

    pub fn get_custom_field(&self, name: &str) -> Option<Arc<CustomField>> {
        self.custom_fields.get_by_key(name)
    }

    /// Every interface currently indexed for `device`.
    pub fn device_interfaces(&self, device: &str) -> Vec<Arc<Interface>> {
        let mut interfaces: Vec<_> = self
            .interfaces
            .snapshot()
            .into_iter()
            .filter(|iface| iface.device.name == device)
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }

    // ── Kind-erased access ───────────────────────────────────────────

    pub fn len(&self, kind: ObjectKind) -> usize {
        self.index(kind).count()
    }

    /// The indexed object of `kind` holding remote id `id`.
    pub fn get_by_id(&self, kind: ObjectKind, id: RemoteId) -> Option<AnyObject> {
        self.index(kind).get_any(id)
    }

    /// Every indexed object of `kind`, ordered by natural key.
    pub fn snapshot(&self, kind: ObjectKind) -> Vec<AnyObject> {
        let mut objects = self.index(kind).snapshot_any();
        objects.sort_by_key(AnyObject::key);
        objects
    }

    fn index(&self, kind: ObjectKind) -> &dyn ErasedIndex {
        match kind {
            ObjectKind::Site => &self.sites,
            ObjectKind::Manufacturer => &self.manufacturers,
            ObjectKind::Platform => &self.platforms,
            ObjectKind::DeviceType => &self.device_types,
            ObjectKind::DeviceRole => &self.device_roles,
            ObjectKind::Tenant => &self.tenants,
            ObjectKind::Device => &self.devices,
            ObjectKind::VlanGroup => &self.vlan_groups,
            ObjectKind::Vlan => &self.vlans,
            ObjectKind::Interface => &self.interfaces,
            ObjectKind::IpAddress => &self.ip_addresses,
            ObjectKind::Prefix => &self.prefixes,
            ObjectKind::ClusterType => &self.cluster_types,
            ObjectKind::ClusterGroup => &self.cluster_groups,
            ObjectKind::Cluster => &self.clusters,
            ObjectKind::CustomField => &self.custom_fields,
        }
    }

    // ── Orphans and reporting ────────────────────────────────────────

    /// Delete every managed object no pass referenced.
    ///
    /// Callers must only invoke this after every source completed.
    pub async fn prune_orphans(&self) -> PruneReport {
        let report = self
            .orphans
            .prune(self.destination.as_ref(), |kind, id| {
                self.index(kind).evict(id);
            })
            .await;
        for (kind, _) in &report.deleted {
            self.count(*kind, Change::Deleted);
        }
        report
    }

    /// Change counters per kind, for kinds that saw any activity.
    pub fn change_summary(&self) -> BTreeMap<ObjectKind, ChangeSummary> {
        self.changes
            .iter()
            .map(|r| (*r.key(), *r.value()))
            .collect()
    }
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("tag", &self.tag)
            .field("devices", &self.devices.len())
            .field("interfaces", &self.interfaces.len())
            .finish_non_exhaustive()
    }
}

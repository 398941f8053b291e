// ── Destination domain model ──
//
// Every type in this module mirrors an object on the destination inventory
// system. Relationships are `Arc` handles to objects already held by the
// index, so a device always points at the exact site the index returned.

pub mod common;
pub mod dcim;
pub mod ipam;
pub mod object;
pub mod supporting;

// ── Re-exports ──────────────────────────────────────────────────────

pub use common::{
    CUSTOM_FIELD_ARP_ENTRY, CUSTOM_FIELD_DEVICE_UUID, CUSTOM_FIELD_HOST_CPU_CORES,
    CUSTOM_FIELD_HOST_MEMORY, CUSTOM_FIELD_SOURCE, CUSTOM_FIELD_SOURCE_ID, ObjectKind, ObjectMeta,
    RemoteId,
};
pub use dcim::{
    Device, DeviceRole, DeviceStatus, DeviceType, Interface, InterfaceType, Manufacturer, Platform,
    Site,
};
pub use ipam::{IpAddress, IpAddressStatus, MAX_VID, MIN_VID, Prefix, PrefixStatus, Vlan, VlanGroup, VlanStatus};
pub use object::{AnyObject, InventoryObject};
pub use supporting::{Cluster, ClusterGroup, ClusterType, CustomField, CustomFieldType, Tenant};

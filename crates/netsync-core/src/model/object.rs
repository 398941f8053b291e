// ── Inventory object abstraction ──
//
// `InventoryObject` is what the object index stores; `AnyObject` is the
// type-erased form handed to the destination client.

use std::sync::Arc;

use super::common::{ObjectKind, ObjectMeta};
use super::dcim::{Device, DeviceRole, DeviceType, Interface, Manufacturer, Platform, Site};
use super::ipam::{IpAddress, Prefix, Vlan, VlanGroup};
use super::supporting::{Cluster, ClusterGroup, ClusterType, CustomField, Tenant};

/// An entity kind the inventory can index by natural key.
pub trait InventoryObject: Clone + PartialEq + Send + Sync + 'static {
    const KIND: ObjectKind;

    /// Natural identity, unique per kind within one run.
    fn key(&self) -> String;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Fold a newer candidate for the same key into `self`.
    fn merge(&mut self, candidate: Self);

    fn to_any(&self) -> AnyObject;

    fn from_any(object: AnyObject) -> Option<Self>;
}

// ── Relation identity ───────────────────────────────────────────────
//
// Related objects are compared by identity, never by content: a device
// is unchanged when it still points at the same tenant, whatever became
// of that tenant's tags since.

/// Same remote object: equal remote ids, or equal keys while unsaved.
pub(crate) fn same_ref<T: InventoryObject>(a: &Arc<T>, b: &Arc<T>) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    match (a.meta().id, b.meta().id) {
        (Some(x), Some(y)) => x == y,
        _ => a.key() == b.key(),
    }
}

pub(crate) fn same_opt_ref<T: InventoryObject>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_ref(a, b),
        (None, None) => true,
        _ => false,
    }
}

pub(crate) fn same_refs<T: InventoryObject>(a: &[Arc<T>], b: &[Arc<T>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_ref(a, b))
}

/// Any inventory object, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyObject {
    Site(Site),
    Manufacturer(Manufacturer),
    Platform(Platform),
    DeviceType(DeviceType),
    DeviceRole(DeviceRole),
    Tenant(Tenant),
    Device(Device),
    VlanGroup(VlanGroup),
    Vlan(Vlan),
    Interface(Interface),
    IpAddress(IpAddress),
    Prefix(Prefix),
    ClusterType(ClusterType),
    ClusterGroup(ClusterGroup),
    Cluster(Cluster),
    CustomField(CustomField),
}

macro_rules! inventory_objects {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl InventoryObject for $ty {
                const KIND: ObjectKind = ObjectKind::$ty;

                fn key(&self) -> String {
                    $ty::key(self)
                }

                fn meta(&self) -> &ObjectMeta {
                    &self.meta
                }

                fn meta_mut(&mut self) -> &mut ObjectMeta {
                    &mut self.meta
                }

                fn merge(&mut self, candidate: Self) {
                    $ty::merge(self, candidate);
                }

                fn to_any(&self) -> AnyObject {
                    AnyObject::$ty(self.clone())
                }

                fn from_any(object: AnyObject) -> Option<Self> {
                    match object {
                        AnyObject::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+

        impl AnyObject {
            pub fn kind(&self) -> ObjectKind {
                match self {
                    $(Self::$ty(_) => ObjectKind::$ty,)+
                }
            }

            pub fn key(&self) -> String {
                match self {
                    $(Self::$ty(inner) => inner.key(),)+
                }
            }

            pub fn meta(&self) -> &ObjectMeta {
                match self {
                    $(Self::$ty(inner) => &inner.meta,)+
                }
            }

            pub fn meta_mut(&mut self) -> &mut ObjectMeta {
                match self {
                    $(Self::$ty(inner) => &mut inner.meta,)+
                }
            }
        }
    };
}

inventory_objects!(
    Site,
    Manufacturer,
    Platform,
    DeviceType,
    DeviceRole,
    Tenant,
    Device,
    VlanGroup,
    Vlan,
    Interface,
    IpAddress,
    Prefix,
    ClusterType,
    ClusterGroup,
    Cluster,
    CustomField,
);

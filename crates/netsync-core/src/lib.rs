//! Reconciliation core between network inventory sources and a DCIM/IPAM
//! destination.
//!
//! This crate owns the domain model and the algorithms that turn raw source
//! records into an idempotent set of destination writes:
//!
//! - **[`Inventory`]**: Per-run object index. One concurrent, natural-key
//!   indexed collection per object kind, with `add_*` find-or-create-or-update
//!   operations serialised per kind through an async write gate.
//!
//! - **[`RegexRelations`] / [`RelationResolver`]**: Ordered `regex = value`
//!   rules that map host and VLAN names onto tenants, sites, roles and VLAN
//!   groups, with fallbacks taken from the source's [`SourcePolicy`].
//!
//! - **[`OrphanManager`]**: Tracks which destination objects this system
//!   owns and which were referenced during the run; prunes the rest in
//!   dependency order.
//!
//! - **[`TopologyAssembler`]**: Builds a device's interfaces in the order
//!   physical → VLAN → ether-channel → sub-interface, deriving VLANs, IP
//!   addresses and prefixes on the way.
//!
//! - **[`Reconciler`]**: Runs every source pass concurrently against one
//!   shared [`Inventory`] and decides whether orphans may be pruned.
//!
//! - **[`Destination`]**: The seam to the destination system. The REST
//!   client lives outside this crate; [`MemoryDestination`] backs dry runs
//!   and tests.

pub mod config;
pub mod destination;
pub mod error;
pub mod matcher;
pub mod model;
pub mod orphan;
pub mod resolver;
pub mod source;
pub mod store;
pub mod sync;
pub mod topology;
pub mod util;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DefaultRole, RelationRules, SourcePolicy};
pub use destination::{Destination, MemoryDestination, Operation, OperationKind};
pub use error::{CoreError, DestinationError};
pub use matcher::{RegexRelations, RelationRule};
pub use orphan::{OrphanFailure, OrphanManager, PruneReport};
pub use resolver::RelationResolver;
pub use source::{
    AddressAssignment, DeviceRecord, InterfaceIpv4, InterfaceRecord, SourceSnapshot,
    SubInterfaceRecord, VlanInterfaceRecord,
};
pub use store::{ChangeSummary, Inventory};
pub use sync::{DeviceFailure, ReconcileReport, Reconciler, SourceSync, SyncReport};
pub use topology::{TopologyAssembler, TopologyReport};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AnyObject, Device, DeviceRole, DeviceType, Interface, InterfaceType, InventoryObject,
    IpAddress, ObjectKind, ObjectMeta, Prefix, RemoteId, Site, Tenant, Vlan, VlanGroup,
};

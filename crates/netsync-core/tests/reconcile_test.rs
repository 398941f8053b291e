#![allow(clippy::unwrap_used)]
// End-to-end reconciliation tests against the in-memory destination.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use netsync_core::model::{CUSTOM_FIELD_ARP_ENTRY, IpAddressStatus};
use netsync_core::util::parse_subnets;
use netsync_core::{
    AddressAssignment, AnyObject, DeviceRecord, Inventory, InterfaceIpv4, InterfaceRecord,
    InterfaceType, MemoryDestination, ObjectKind, ObjectMeta, OperationKind, Reconciler,
    RegexRelations, Site, SourcePolicy, SourceSnapshot, SourceSync, SubInterfaceRecord,
    VlanInterfaceRecord,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn policy(name: &str) -> SourcePolicy {
    let mut policy = SourcePolicy::new(name);
    policy.default_site = Some("HQ".into());
    policy.permitted_subnets = parse_subnets(&["10.0.0.0/8"]).unwrap();
    policy
}

fn iface(id: &str, name: &str, address: Option<(&str, &str)>) -> InterfaceRecord {
    InterfaceRecord {
        id: id.into(),
        name: name.into(),
        ipv4: address.map(|(address, netmask)| InterfaceIpv4 {
            static_address: Some(AddressAssignment {
                address: address.into(),
                netmask: netmask.into(),
            }),
            dhcp: None,
        }),
        ..InterfaceRecord::default()
    }
}

fn svi(id: &str, name: &str, vid: u16, address: Option<(&str, &str)>) -> VlanInterfaceRecord {
    VlanInterfaceRecord {
        interface: iface(id, name, address),
        vid,
    }
}

fn sub(id: &str, name: &str, parent: &str, vlan_id: u16, address: Option<(&str, &str)>) -> SubInterfaceRecord {
    SubInterfaceRecord {
        interface: iface(id, name, address),
        parent_name: parent.into(),
        vlan_id,
    }
}

fn device(id: &str, name: &str) -> DeviceRecord {
    DeviceRecord {
        id: id.into(),
        name: name.into(),
        model: "FPR-2130".into(),
        manufacturer: "Cisco".into(),
        serial: format!("SN-{id}"),
        os_name: "FTD".into(),
        os_version: "7.2.5".into(),
        cpu_cores: Some(8),
        memory_mb: Some(16384),
        physical_interfaces: vec![iface("p1", "Ethernet1/1", Some(("10.0.0.5", "255.255.255.0")))],
        ..DeviceRecord::default()
    }
}

fn firewall() -> DeviceRecord {
    DeviceRecord {
        vlan_interfaces: vec![
            svi("v20", "Vlan20", 20, Some(("10.20.0.1", "24"))),
            svi("v0", "Vlan0", 0, None),
            svi("v40", "Vlan40", 40, Some(("10.40.0.1", "32"))),
        ],
        ether_channel_interfaces: vec![iface("pc1", "Port-channel1", None)],
        sub_interfaces: vec![
            sub("s30", "Ethernet1/1.30", "Ethernet1/1", 30, Some(("10.30.0.1", "255.255.255.0"))),
            sub("s1", "Ethernet1/1.1", "Ethernet1/1", 1, None),
            sub("s5", "Missing.5", "Ethernet9/9", 5, None),
            sub("s7", "Port-channel1.7", "Port-channel1", 7, None),
        ],
        ..device("dev-1", "fw-edge-01")
    }
}

fn snapshot(devices: Vec<DeviceRecord>) -> SourceSnapshot {
    SourceSnapshot { devices }
}

fn setup() -> (Arc<MemoryDestination>, Arc<Inventory>) {
    let dest = Arc::new(MemoryDestination::new());
    let inventory = Arc::new(Inventory::new(dest.clone(), "netsync"));
    (dest, inventory)
}

fn fresh_inventory(dest: &Arc<MemoryDestination>) -> Arc<Inventory> {
    Arc::new(Inventory::new(dest.clone(), "netsync"))
}

// ── Topology ────────────────────────────────────────────────────────

#[tokio::test]
async fn interfaces_are_built_in_stage_order() {
    let (_, inv) = setup();
    let policy = policy("fmc");

    let report = SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;
    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert_eq!(report.devices_synced, 1);
    assert_eq!(report.topology.interfaces, 9);

    let phys = inv.get_interface("fw-edge-01", "Ethernet1/1").unwrap();
    assert_eq!(phys.interface_type, InterfaceType::Other);
    assert!(phys.tagged_vlans.is_empty());
    assert_eq!(phys.meta.source_id(), Some("p1"));

    let lag = inv.get_interface("fw-edge-01", "Port-channel1").unwrap();
    assert_eq!(lag.interface_type, InterfaceType::Lag);

    let vlan20 = inv.get_interface("fw-edge-01", "Vlan20").unwrap();
    assert_eq!(vlan20.interface_type, InterfaceType::Virtual);
    assert_eq!(vlan20.tagged_vlans.len(), 1);
    assert_eq!(vlan20.tagged_vlans[0].vid, 20);

    let sub30 = inv.get_interface("fw-edge-01", "Ethernet1/1.30").unwrap();
    assert_eq!(sub30.parent.as_ref().unwrap().name, "Ethernet1/1");
    assert_eq!(sub30.tagged_vlans[0].vid, 30);

    let sub7 = inv.get_interface("fw-edge-01", "Port-channel1.7").unwrap();
    assert_eq!(sub7.parent.as_ref().unwrap().interface_type, InterfaceType::Lag);
}

#[tokio::test]
async fn missing_parent_leaves_parent_unset() {
    let (_, inv) = setup();
    let policy = policy("fmc");

    let report = SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;
    assert!(report.is_clean());

    let orphan_sub = inv.get_interface("fw-edge-01", "Missing.5").unwrap();
    assert!(orphan_sub.parent.is_none());
    assert_eq!(orphan_sub.tagged_vlans[0].vid, 5);
}

#[tokio::test]
async fn sub_interface_never_parents_another_sub_interface() {
    for nested_first in [false, true] {
        let (_, inv) = setup();
        let policy = policy("fmc");
        let mut subs = vec![
            sub("s10", "Ethernet1/1.10", "Ethernet1/1", 10, None),
            sub("s105", "Ethernet1/1.10.5", "Ethernet1/1.10", 5, None),
        ];
        if nested_first {
            subs.reverse();
        }
        let record = DeviceRecord {
            sub_interfaces: subs,
            ..device("dev-1", "fw-edge-01")
        };

        let report = SourceSync::new(&inv, &policy).run(&snapshot(vec![record])).await;
        assert!(report.is_clean());

        let outer = inv.get_interface("fw-edge-01", "Ethernet1/1.10").unwrap();
        assert_eq!(outer.parent.as_ref().unwrap().name, "Ethernet1/1");

        let nested = inv.get_interface("fw-edge-01", "Ethernet1/1.10.5").unwrap();
        assert!(nested.parent.is_none(), "nested_first={nested_first}");
        assert_eq!(nested.tagged_vlans[0].vid, 5);
    }
}

#[tokio::test]
async fn vlan_zero_and_one_create_no_vlan() {
    let (dest, inv) = setup();
    let policy = policy("fmc");

    SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    assert!(inv.get_interface("fw-edge-01", "Vlan0").unwrap().tagged_vlans.is_empty());
    assert!(inv.get_interface("fw-edge-01", "Ethernet1/1.1").unwrap().tagged_vlans.is_empty());
    assert!(inv.get_vlan("Vlan0", Some("HQ")).is_none());
    assert!(inv.get_vlan("Ethernet1/1.1", Some("HQ")).is_none());

    // Vlan20, Vlan40, Ethernet1/1.30, Missing.5, Port-channel1.7
    assert_eq!(dest.count(ObjectKind::Vlan), 5);
}

#[tokio::test]
async fn empty_interface_names_are_skipped() {
    let (_, inv) = setup();
    let policy = policy("fmc");
    let mut record = device("dev-1", "fw-edge-01");
    record.physical_interfaces.push(iface("p2", "", Some(("10.0.0.6", "24"))));
    record.vlan_interfaces.push(svi("v9", "", 9, None));

    let report = SourceSync::new(&inv, &policy).run(&snapshot(vec![record])).await;

    assert!(report.is_clean());
    assert_eq!(report.topology.skipped_interfaces, 2);
    assert_eq!(report.topology.interfaces, 1);
    assert_eq!(inv.device_interfaces("fw-edge-01").len(), 1);
}

// ── Addresses and prefixes ──────────────────────────────────────────

#[tokio::test]
async fn svi_address_yields_ip_and_prefix() {
    let (_, inv) = setup();
    let mut policy = policy("fmc");
    policy.relations.vlan_tenant = RegexRelations::parse(["^Vlan = Blue"]).unwrap();

    SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    let ip = inv.get_ip_address("fw-edge-01", "Vlan20", "10.20.0.1/24").unwrap();
    assert_eq!(ip.meta.custom_fields[CUSTOM_FIELD_ARP_ENTRY], json!(false));
    assert_eq!(ip.assigned_interface.as_ref().unwrap().name, "Vlan20");

    let prefix = inv.get_prefix("10.20.0.0/24").unwrap();
    assert_eq!(prefix.vlan.as_ref().unwrap().name, "Vlan20");
    assert_eq!(prefix.tenant.as_ref().unwrap().name, "Blue");

    let sub_prefix = inv.get_prefix("10.30.0.0/24").unwrap();
    assert_eq!(sub_prefix.vlan.as_ref().unwrap().vid, 30);
    assert!(sub_prefix.tenant.is_none());
}

#[tokio::test]
async fn host_route_yields_no_prefix() {
    let (_, inv) = setup();
    let policy = policy("fmc");

    SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    assert!(inv.get_ip_address("fw-edge-01", "Vlan40", "10.40.0.1/32").is_some());
    assert!(inv.get_prefix("10.40.0.1/32").is_none());
    assert!(inv.snapshot(ObjectKind::Prefix).iter().all(|p| !p.key().starts_with("10.40.")));
}

#[tokio::test]
async fn physical_address_yields_no_prefix() {
    let (_, inv) = setup();
    let policy = policy("fmc");

    SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    assert!(inv.get_ip_address("fw-edge-01", "Ethernet1/1", "10.0.0.5/24").is_some());
    assert!(inv.get_prefix("10.0.0.0/24").is_none());
    assert_eq!(inv.len(ObjectKind::Prefix), 2);
}

#[tokio::test]
async fn leased_address_keeps_dhcp_status() {
    let (_, inv) = setup();
    let policy = policy("fmc");
    let mut leased = iface("p2", "Ethernet1/2", None);
    leased.ipv4 = Some(InterfaceIpv4 {
        static_address: None,
        dhcp: Some(AddressAssignment {
            address: "10.9.0.7".into(),
            netmask: "255.255.255.0".into(),
        }),
    });
    let mut record = device("dev-1", "fw-edge-01");
    record.physical_interfaces.push(leased);

    SourceSync::new(&inv, &policy).run(&snapshot(vec![record])).await;

    let dhcp = inv.get_ip_address("fw-edge-01", "Ethernet1/2", "10.9.0.7/24").unwrap();
    assert_eq!(dhcp.status, IpAddressStatus::Dhcp);
    let fixed = inv.get_ip_address("fw-edge-01", "Ethernet1/1", "10.0.0.5/24").unwrap();
    assert_eq!(fixed.status, IpAddressStatus::Active);
}

#[tokio::test]
async fn ignored_subnet_filters_address() {
    let (_, inv) = setup();
    let mut policy = policy("fmc");
    policy.ignored_subnets = parse_subnets(&["10.0.0.0/24"]).unwrap();

    let report = SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    assert!(inv.get_ip_address("fw-edge-01", "Ethernet1/1", "10.0.0.5/24").is_none());
    assert!(inv.get_ip_address("fw-edge-01", "Vlan20", "10.20.0.1/24").is_some());
    assert_eq!(report.topology.filtered_addresses, 1);
}

#[tokio::test]
async fn no_permitted_subnets_admits_no_addresses() {
    let (_, inv) = setup();
    let mut policy = policy("fmc");
    policy.permitted_subnets.clear();

    SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    assert_eq!(inv.len(ObjectKind::IpAddress), 0);
    assert_eq!(inv.len(ObjectKind::Prefix), 0);
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn device_carries_source_fields_and_resolved_relations() {
    let (_, inv) = setup();
    let mut policy = policy("fmc");
    policy.relations.host_tenant = RegexRelations::parse(["edge = Perimeter"]).unwrap();

    SourceSync::new(&inv, &policy).run(&snapshot(vec![firewall()])).await;

    let dev = inv.get_device("fw-edge-01").unwrap();
    assert_eq!(dev.serial, "SN-dev-1");
    assert_eq!(dev.role.name, "Firewall");
    assert_eq!(dev.site.as_ref().unwrap().name, "HQ");
    assert_eq!(dev.tenant.as_ref().unwrap().name, "Perimeter");
    assert_eq!(dev.platform.as_ref().unwrap().name, "FTD 7.2.5");
    assert_eq!(dev.device_type.manufacturer.name, "Cisco");
    assert_eq!(dev.meta.source_id(), Some("dev-1"));
    assert_eq!(dev.meta.custom_fields["host_memory"], json!("16384MB"));
    assert_eq!(dev.meta.custom_fields["host_cpu_cores"], json!("8"));
    assert!(dev.meta.has_tag("source:fmc"));
    assert!(dev.meta.has_tag("netsync"));
}

#[tokio::test]
async fn placeholders_and_ignored_serials() {
    let (_, inv) = setup();
    let mut policy = policy("fmc");
    policy.ignore_serial_numbers = true;
    policy.manufacturer = Some("Cisco".into());

    let record = DeviceRecord {
        id: "dev-9".into(),
        name: "fw-bare".into(),
        serial: "SN-9".into(),
        ..DeviceRecord::default()
    };
    SourceSync::new(&inv, &policy).run(&snapshot(vec![record])).await;

    let dev = inv.get_device("fw-bare").unwrap();
    assert!(dev.serial.is_empty());
    assert_eq!(dev.device_type.model, "Generic Model");
    assert_eq!(dev.device_type.manufacturer.name, "Cisco");
    assert_eq!(dev.platform.as_ref().unwrap().name, "Generic OS Generic Version");
}

#[tokio::test]
async fn failing_device_does_not_stop_the_pass() {
    let (dest, inv) = setup();
    dest.fail_writes_for(ObjectKind::Device, "fw-bad");
    let policy = policy("fmc");

    let report = SourceSync::new(&inv, &policy)
        .run(&snapshot(vec![device("dev-1", "fw-bad"), device("dev-2", "fw-good")]))
        .await;

    assert_eq!(report.devices_synced, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].device, "fw-bad");
    assert!(inv.get_device("fw-good").is_some());
    assert!(inv.get_interface("fw-bad", "Ethernet1/1").is_none());
}

// ── Whole runs ──────────────────────────────────────────────────────

#[tokio::test]
async fn second_identical_run_writes_nothing() {
    let dest = Arc::new(MemoryDestination::new());

    let first = Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(policy("fmc"), snapshot(vec![firewall()]))])
        .await
        .unwrap();
    assert!(first.pruned.unwrap().deleted.is_empty());
    let writes_after_first = dest.operations().len();

    let second = Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(policy("fmc"), snapshot(vec![firewall()]))])
        .await
        .unwrap();

    assert_eq!(dest.operations().len(), writes_after_first);
    assert!(second.pruned.unwrap().deleted.is_empty());
    assert!(second.changes.values().all(|c| c.total_writes() == 0));
}

#[tokio::test]
async fn second_identical_run_with_shared_relations_writes_nothing() {
    let dest = Arc::new(MemoryDestination::new());
    let sources = || {
        let mut a = policy("fmc-a");
        a.relations.host_tenant = RegexRelations::parse([".* = Shared"]).unwrap();
        let mut b = policy("fmc-b");
        b.relations.host_tenant = RegexRelations::parse([".* = Shared"]).unwrap();
        vec![
            (a, snapshot(vec![device("a1", "fw-a1"), device("a2", "fw-a2")])),
            (b, snapshot(vec![device("b1", "fw-b1"), device("b2", "fw-b2")])),
        ]
    };

    Reconciler::new(fresh_inventory(&dest), true).run(sources()).await.unwrap();
    let tenant = dest.find(ObjectKind::Tenant, "Shared").unwrap();
    assert!(tenant.meta().has_tag("source:fmc-a") && tenant.meta().has_tag("source:fmc-b"));
    let writes_after_first = dest.operations().len();

    let second = Reconciler::new(fresh_inventory(&dest), true).run(sources()).await.unwrap();

    let extra: Vec<_> = dest.operations().into_iter().skip(writes_after_first).collect();
    assert!(extra.is_empty(), "second run wrote: {extra:?}");
    assert!(second.changes.values().all(|c| c.total_writes() == 0));
    assert!(second.pruned.unwrap().deleted.is_empty());
}

#[tokio::test]
async fn reused_reconciler_prunes_objects_gone_since_last_run() {
    let dest = Arc::new(MemoryDestination::new());
    let reconciler = Reconciler::new(fresh_inventory(&dest), true);

    reconciler
        .run(vec![(policy("fmc"), snapshot(vec![device("dev-1", "fw-a"), device("dev-2", "fw-b")]))])
        .await
        .unwrap();
    let report = reconciler
        .run(vec![(policy("fmc"), snapshot(vec![device("dev-1", "fw-a")]))])
        .await
        .unwrap();

    let pruned = report.pruned.unwrap();
    assert_eq!(pruned.deleted_of(ObjectKind::Device), 1);
    assert!(dest.find(ObjectKind::Device, "fw-b").is_none());
    assert!(dest.find(ObjectKind::Device, "fw-a").is_some());
    assert_eq!(report.changes[&ObjectKind::Device].created, 0);
}

#[tokio::test]
async fn unreported_objects_are_pruned() {
    let dest = Arc::new(MemoryDestination::new());
    let foreign = dest.seed(AnyObject::Site(Site {
        meta: ObjectMeta::default(),
        name: "Foreign".into(),
        slug: "foreign".into(),
    }));

    Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(
            policy("fmc"),
            snapshot(vec![device("dev-1", "fw-a"), device("dev-2", "fw-b")]),
        )])
        .await
        .unwrap();
    let b_id = dest.find(ObjectKind::Device, "fw-b").unwrap().meta().id.unwrap();

    let report = Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(policy("fmc"), snapshot(vec![device("dev-1", "fw-a")]))])
        .await
        .unwrap();
    let pruned = report.pruned.unwrap();

    assert!(!dest.contains(b_id));
    assert_eq!(pruned.deleted_of(ObjectKind::Device), 1);
    assert_eq!(pruned.deleted_of(ObjectKind::Interface), 1);
    assert_eq!(pruned.deleted_of(ObjectKind::IpAddress), 1);
    assert!(dest.find(ObjectKind::Device, "fw-a").is_some());
    assert!(dest.find(ObjectKind::Manufacturer, "Cisco").is_some());
    assert!(dest.contains(foreign));

    let deletes: Vec<_> = dest
        .operations()
        .into_iter()
        .filter(|op| op.op == OperationKind::Delete)
        .map(|op| op.kind)
        .collect();
    assert_eq!(deletes, vec![ObjectKind::IpAddress, ObjectKind::Interface, ObjectKind::Device]);
}

#[tokio::test]
async fn failed_device_withholds_pruning() {
    let dest = Arc::new(MemoryDestination::new());
    Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(policy("fmc"), snapshot(vec![device("dev-1", "fw-a"), device("dev-2", "fw-b")]))])
        .await
        .unwrap();

    dest.fail_writes_for(ObjectKind::Device, "fw-a");
    let mut changed = device("dev-1", "fw-a");
    changed.description = "moved to rack 4".into();
    let report = Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(policy("fmc"), snapshot(vec![changed]))])
        .await
        .unwrap();

    assert_eq!(report.failed_devices(), 1);
    assert!(report.pruned.is_none());
    assert!(dest.find(ObjectKind::Device, "fw-b").is_some());
}

#[tokio::test]
async fn pruning_disabled_keeps_everything() {
    let dest = Arc::new(MemoryDestination::new());
    Reconciler::new(fresh_inventory(&dest), false)
        .run(vec![(policy("fmc"), snapshot(vec![device("dev-1", "fw-a")]))])
        .await
        .unwrap();

    let report = Reconciler::new(fresh_inventory(&dest), false)
        .run(vec![(policy("fmc"), snapshot(Vec::new()))])
        .await
        .unwrap();

    assert!(report.pruned.is_none());
    assert!(dest.find(ObjectKind::Device, "fw-a").is_some());
}

#[tokio::test]
async fn concurrent_sources_share_relation_objects() {
    let dest = Arc::new(MemoryDestination::new());
    let mut a = policy("fmc-a");
    a.relations.host_tenant = RegexRelations::parse([".* = Shared"]).unwrap();
    let mut b = policy("fmc-b");
    b.relations.host_tenant = RegexRelations::parse([".* = Shared"]).unwrap();

    let devices_a: Vec<_> = (0..5).map(|i| device(&format!("a{i}"), &format!("fw-a{i}"))).collect();
    let devices_b: Vec<_> = (0..5).map(|i| device(&format!("b{i}"), &format!("fw-b{i}"))).collect();

    let report = Reconciler::new(fresh_inventory(&dest), true)
        .run(vec![(a, snapshot(devices_a)), (b, snapshot(devices_b))])
        .await
        .unwrap();

    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.sources[0].source, "fmc-a");
    assert_eq!(report.failed_devices(), 0);
    assert_eq!(dest.count(ObjectKind::Tenant), 1);
    assert_eq!(dest.operation_count(OperationKind::Create, ObjectKind::Tenant), 1);
    assert_eq!(dest.count(ObjectKind::Site), 1);
    assert_eq!(dest.count(ObjectKind::Device), 10);
}

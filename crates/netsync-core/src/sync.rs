// ── Source passes and whole-run reconciliation ──
//
// `SourceSync` walks one source's devices sequentially; a failing device
// is recorded and the pass moves on. `Reconciler` runs every source pass
// concurrently against one shared inventory and prunes orphans only when
// every pass finished cleanly.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::SourcePolicy;
use crate::error::CoreError;
use crate::model::{
    CUSTOM_FIELD_DEVICE_UUID, CUSTOM_FIELD_HOST_CPU_CORES, CUSTOM_FIELD_HOST_MEMORY,
    CUSTOM_FIELD_SOURCE, CUSTOM_FIELD_SOURCE_ID, Device, DeviceStatus, DeviceType, Manufacturer,
    ObjectKind, ObjectMeta, Platform,
};
use crate::orphan::PruneReport;
use crate::resolver::RelationResolver;
use crate::source::{DeviceRecord, SourceSnapshot};
use crate::store::{ChangeSummary, Inventory};
use crate::topology::{TopologyAssembler, TopologyReport};
use crate::util::slugify;

/// Placeholders for device attributes a source did not report.
pub const GENERIC_MANUFACTURER: &str = "Generic Manufacturer";
pub const GENERIC_MODEL: &str = "Generic Model";
pub const GENERIC_OS: &str = "Generic OS";
pub const GENERIC_VERSION: &str = "Generic Version";

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DeviceFailure {
    pub device: String,
    pub error: String,
}

/// Outcome of one source pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub source: String,
    pub devices_synced: usize,
    pub devices_skipped: usize,
    pub failures: Vec<DeviceFailure>,
    pub topology: TopologyReport,
}

impl SyncReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            devices_synced: 0,
            devices_skipped: 0,
            failures: Vec::new(),
            topology: TopologyReport::default(),
        }
    }

    /// Every device either synced or was deliberately skipped.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub sources: Vec<SyncReport>,
    /// Source passes that panicked or were cancelled.
    pub aborted_sources: usize,
    /// `None` when pruning was disabled or withheld.
    pub pruned: Option<PruneReport>,
    pub changes: BTreeMap<ObjectKind, ChangeSummary>,
    pub finished_at: DateTime<Utc>,
}

impl ReconcileReport {
    pub fn failed_devices(&self) -> usize {
        self.sources.iter().map(|s| s.failures.len()).sum()
    }
}

// ── SourceSync ──────────────────────────────────────────────────────

/// One pass of one source over the shared inventory.
pub struct SourceSync<'a> {
    inventory: &'a Inventory,
    policy: &'a SourcePolicy,
}

impl<'a> SourceSync<'a> {
    pub fn new(inventory: &'a Inventory, policy: &'a SourcePolicy) -> Self {
        Self { inventory, policy }
    }

    pub async fn run(&self, snapshot: &SourceSnapshot) -> SyncReport {
        let source = self.policy.name.as_str();
        info!(source, devices = snapshot.devices.len(), "source pass started");

        let mut report = SyncReport::new(source);
        for record in &snapshot.devices {
            if record.name.trim().is_empty() {
                warn!(source, source_id = %record.id, "device record without a name skipped");
                report.devices_skipped += 1;
                continue;
            }
            match self.sync_device(record).await {
                Ok(topology) => {
                    report.devices_synced += 1;
                    report.topology.absorb(topology);
                }
                Err(e) => {
                    warn!(source, device = %record.name, error = %e, "device sync failed");
                    report.failures.push(DeviceFailure {
                        device: record.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            source,
            synced = report.devices_synced,
            skipped = report.devices_skipped,
            failed = report.failures.len(),
            "source pass finished"
        );
        report
    }

    /// Create or update one device and everything hanging off it.
    pub async fn sync_device(&self, record: &DeviceRecord) -> Result<TopologyReport, CoreError> {
        let resolver = RelationResolver::new(self.inventory, self.policy);
        let tags = self.policy.source_tags();

        let manufacturer_name = non_empty(&record.manufacturer)
            .or(self.policy.manufacturer.as_deref())
            .unwrap_or(GENERIC_MANUFACTURER);
        let manufacturer = self
            .inventory
            .add_manufacturer(Manufacturer {
                meta: ObjectMeta::with_tags(tags.clone()),
                name: manufacturer_name.to_owned(),
                slug: slugify(manufacturer_name),
            })
            .await?;

        let model = non_empty(&record.model).unwrap_or(GENERIC_MODEL);
        let device_type = self
            .inventory
            .add_device_type(DeviceType {
                meta: ObjectMeta::with_tags(tags.clone()),
                manufacturer: Arc::clone(&manufacturer),
                model: model.to_owned(),
                slug: slugify(model),
            })
            .await?;

        let tenant = resolver.host_tenant(&record.name).await?;
        let role = resolver.host_role(&record.name).await?;
        let site = resolver.host_site(&record.name).await?;

        let platform_name = platform_name(&record.os_name, &record.os_version);
        let platform = self
            .inventory
            .add_platform(Platform {
                meta: ObjectMeta::with_tags(tags.clone()),
                slug: slugify(&platform_name),
                name: platform_name,
                manufacturer: Some(manufacturer),
            })
            .await?;

        let serial = if self.policy.ignore_serial_numbers {
            String::new()
        } else {
            record.serial.clone()
        };

        let device = self
            .inventory
            .add_device(Device {
                meta: self.device_meta(record),
                name: record.name.clone(),
                role,
                device_type,
                site,
                tenant,
                platform: Some(platform),
                serial,
                status: DeviceStatus::Active,
            })
            .await?;

        TopologyAssembler::new(self.inventory, self.policy, device)
            .assemble(record)
            .await
    }

    fn device_meta(&self, record: &DeviceRecord) -> ObjectMeta {
        let cpu = record.cpu_cores.map_or(Value::Null, |n| Value::from(n.to_string()));
        let memory = record
            .memory_mb
            .map_or(Value::Null, |mb| Value::from(format!("{mb}MB")));

        ObjectMeta::with_tags(self.policy.source_tags())
            .description(record.description.as_str())
            .custom_field(CUSTOM_FIELD_SOURCE, self.policy.name.as_str())
            .custom_field(CUSTOM_FIELD_SOURCE_ID, record.id.as_str())
            .custom_field(CUSTOM_FIELD_DEVICE_UUID, record.id.as_str())
            .custom_field(CUSTOM_FIELD_HOST_CPU_CORES, cpu)
            .custom_field(CUSTOM_FIELD_HOST_MEMORY, memory)
    }
}

/// `"<os> <version>"`, with placeholders for whichever part is missing.
pub fn platform_name(os_name: &str, os_version: &str) -> String {
    let os = non_empty(os_name).unwrap_or(GENERIC_OS);
    let version = non_empty(os_version).unwrap_or(GENERIC_VERSION);
    format!("{os} {version}")
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

// ── Reconciler ──────────────────────────────────────────────────────

/// Drives one full run: load, concurrent source passes, prune.
pub struct Reconciler {
    inventory: Arc<Inventory>,
    remove_orphans: bool,
}

impl Reconciler {
    pub fn new(inventory: Arc<Inventory>, remove_orphans: bool) -> Self {
        Self {
            inventory,
            remove_orphans,
        }
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    pub async fn run(&self, sources: Vec<(SourcePolicy, SourceSnapshot)>) -> Result<ReconcileReport, CoreError> {
        self.inventory.load().await?;
        self.inventory.ensure_custom_fields().await?;

        let mut tasks = JoinSet::new();
        for (policy, snapshot) in sources {
            let inventory = Arc::clone(&self.inventory);
            tasks.spawn(async move { SourceSync::new(&inventory, &policy).run(&snapshot).await });
        }

        let mut reports = Vec::new();
        let mut aborted_sources = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(error = %e, "source pass aborted");
                    aborted_sources += 1;
                }
            }
        }
        reports.sort_by(|a, b| a.source.cmp(&b.source));

        let complete = aborted_sources == 0 && reports.iter().all(SyncReport::is_clean);
        let pruned = match (self.remove_orphans, complete) {
            (false, _) => None,
            (true, true) => Some(self.inventory.prune_orphans().await),
            (true, false) => {
                warn!(
                    pending = self.inventory.orphans().pending_count(),
                    "orphan removal withheld: not every source pass completed"
                );
                None
            }
        };

        Ok(ReconcileReport {
            sources: reports,
            aborted_sources,
            pruned,
            changes: self.inventory.change_summary(),
            finished_at: Utc::now(),
        })
    }
}

//! `plan`: dry-run reconciliation against an in-memory destination.
//!
//! Runs the same passes a live sync would, then reports what was written.
//! Nothing outside this process is touched.

use std::sync::Arc;

use tabled::Tabled;
use tracing::info;

use netsync_config::SourceSettings;
use netsync_core::{
    Inventory, MemoryDestination, Operation, ReconcileReport, Reconciler, SourcePolicy,
    SourceSnapshot,
};

use crate::cli::{GlobalOpts, OutputFormat, PlanArgs};
use crate::config::LoadedConfig;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Synced")]
    synced: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Interfaces")]
    interfaces: usize,
    #[tabled(rename = "VLANs")]
    vlans: usize,
    #[tabled(rename = "Addresses")]
    addresses: usize,
    #[tabled(rename = "Prefixes")]
    prefixes: usize,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Created")]
    created: usize,
    #[tabled(rename = "Updated")]
    updated: usize,
    #[tabled(rename = "Unchanged")]
    unchanged: usize,
    #[tabled(rename = "Deleted")]
    deleted: usize,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "Op")]
    op: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&Operation> for OperationRow {
    fn from(op: &Operation) -> Self {
        Self {
            op: op.op.to_string(),
            kind: op.kind.to_string(),
            id: op.id.to_string(),
            key: op.key.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = LoadedConfig::load(global)?;
    let policies = loaded.config.validate()?;
    let selected = select_sources(&loaded, policies, &args.sources)?;

    let mut runs = Vec::with_capacity(selected.len());
    for (policy, settings) in selected {
        let path = settings
            .resolved_path(loaded.base_dir())
            .ok_or_else(|| CliError::InvalidSource {
                source_name: policy.name.clone(),
                field: "path".into(),
                reason: "required for snapshot sources".into(),
            })?;
        let snapshot = SourceSnapshot::from_path(&path)?;
        info!(
            source = %policy.name,
            path = %path.display(),
            devices = snapshot.devices.len(),
            interfaces = snapshot.interface_count(),
            "snapshot loaded"
        );
        runs.push((policy, snapshot));
    }

    let destination = Arc::new(MemoryDestination::new());
    let inventory = Arc::new(Inventory::new(
        destination.clone(),
        loaded.config.destination.tag.as_str(),
    ));
    let remove_orphans = loaded.config.destination.remove_orphans && !args.no_prune;
    let report = Reconciler::new(inventory, remove_orphans).run(runs).await?;

    let rendered = if args.operations {
        let operations = destination.operations();
        let rows: Vec<OperationRow> = operations.iter().map(OperationRow::from).collect();
        output::render_list(global.output, &operations, &rows)?
    } else {
        render_report(global.output, &report)?
    };
    output::print_output(&rendered, global.quiet);

    let failed_devices = report.failed_devices();
    if failed_devices > 0 || report.aborted_sources > 0 {
        return Err(CliError::Incomplete {
            failed_devices,
            aborted_sources: report.aborted_sources,
        });
    }
    Ok(())
}

/// Policies paired with their settings, narrowed to `wanted` when given.
fn select_sources<'c>(
    loaded: &'c LoadedConfig,
    policies: Vec<SourcePolicy>,
    wanted: &[String],
) -> Result<Vec<(SourcePolicy, &'c SourceSettings)>, CliError> {
    if policies.is_empty() {
        return Err(CliError::NoSources {
            path: loaded.display_path(),
        });
    }

    if let Some(unknown) = wanted
        .iter()
        .find(|name| !policies.iter().any(|p| &p.name == *name))
    {
        let available: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
        return Err(CliError::UnknownSource {
            name: unknown.clone(),
            available: available.join(", "),
        });
    }

    Ok(policies
        .into_iter()
        .zip(&loaded.config.sources)
        .filter(|(policy, _)| wanted.is_empty() || wanted.contains(&policy.name))
        .collect())
}

fn render_report(format: OutputFormat, report: &ReconcileReport) -> Result<String, CliError> {
    let changes: Vec<ChangeRow> = report
        .changes
        .iter()
        .map(|(kind, summary)| ChangeRow {
            kind: kind.to_string(),
            created: summary.created,
            updated: summary.updated,
            unchanged: summary.unchanged,
            deleted: summary.deleted,
        })
        .collect();

    if !matches!(format, OutputFormat::Table) {
        return output::render_list(format, report, &changes);
    }

    let sources: Vec<SourceRow> = report
        .sources
        .iter()
        .map(|s| SourceRow {
            source: s.source.clone(),
            synced: s.devices_synced,
            skipped: s.devices_skipped,
            failed: s.failures.len(),
            interfaces: s.topology.interfaces,
            vlans: s.topology.vlans,
            addresses: s.topology.ip_addresses,
            prefixes: s.topology.prefixes,
        })
        .collect();

    let mut sections = vec![output::render_table(&sources), output::render_table(&changes)];

    let failures: Vec<FailureRow> = report
        .sources
        .iter()
        .flat_map(|s| {
            s.failures.iter().map(|f| FailureRow {
                source: s.source.clone(),
                device: f.device.clone(),
                error: f.error.clone(),
            })
        })
        .collect();
    if !failures.is_empty() {
        sections.push(output::render_table(&failures));
    }

    match &report.pruned {
        Some(pruned) if !pruned.failed.is_empty() => {
            let rows: Vec<FailureRow> = pruned
                .failed
                .iter()
                .map(|f| FailureRow {
                    source: "(prune)".into(),
                    device: format!("{} {}", f.kind, f.id),
                    error: f.error.clone(),
                })
                .collect();
            sections.push(output::render_table(&rows));
        }
        Some(_) => {}
        None => sections.push("Orphan removal skipped.".into()),
    }

    Ok(sections.join("\n"))
}

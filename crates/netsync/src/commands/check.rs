//! `check-config`: validate every source and summarise it.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use netsync_config::{SourceSettings, render_config};
use netsync_core::{RegexRelations, SourcePolicy};

use crate::cli::{CheckConfigArgs, GlobalOpts};
use crate::config::LoadedConfig;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize, Tabled)]
struct SourceSummary {
    #[tabled(rename = "Source")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Snapshot")]
    path: String,
    #[tabled(rename = "Default role")]
    role: String,
    #[tabled(rename = "Default site")]
    default_site: String,
    #[tabled(rename = "Permitted")]
    permitted_subnets: usize,
    #[tabled(rename = "Ignored")]
    ignored_subnets: usize,
    #[tabled(rename = "Rules")]
    rules: usize,
}

impl SourceSummary {
    fn new(settings: &SourceSettings, policy: &SourcePolicy, loaded: &LoadedConfig) -> Self {
        let relations = &policy.relations;
        let rules = [
            &relations.host_tenant,
            &relations.host_role,
            &relations.host_site,
            &relations.vlan_site,
            &relations.vlan_group,
            &relations.vlan_group_site,
            &relations.vlan_tenant,
        ]
        .into_iter()
        .map(RegexRelations::len)
        .sum();

        Self {
            name: policy.name.clone(),
            kind: settings.kind.clone(),
            path: settings
                .resolved_path(loaded.base_dir())
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            role: policy.default_role.to_string(),
            default_site: policy.default_site.clone().unwrap_or_else(|| "-".into()),
            permitted_subnets: policy.permitted_subnets.len(),
            ignored_subnets: policy.ignored_subnets.len(),
            rules,
        }
    }
}

pub fn handle(args: &CheckConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = LoadedConfig::load(global)?;
    let policies = loaded.config.validate()?;

    if args.effective {
        output::print_output(&render_config(&loaded.config)?, global.quiet);
        return Ok(());
    }

    if policies.is_empty() {
        warn!(path = %loaded.display_path(), "config has no sources");
    }

    let summaries: Vec<SourceSummary> = loaded
        .config
        .sources
        .iter()
        .zip(&policies)
        .map(|(settings, policy)| SourceSummary::new(settings, policy, &loaded))
        .collect();

    let rendered = output::render_list(global.output, &summaries, &summaries)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

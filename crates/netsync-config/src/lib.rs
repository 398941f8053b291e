//! Configuration for the netsync CLI.
//!
//! TOML file + `NETSYNC_` environment overrides, and compilation of each
//! `[[sources]]` table into a `netsync_core::SourcePolicy`. Everything that
//! can be wrong with a source (rules, subnets, kind) is caught here, before
//! a run touches the destination.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netsync_core::util::parse_subnets;
use netsync_core::{DefaultRole, RegexRelations, RelationRules, SourcePolicy};

/// The only source kind this build knows how to read.
pub const SNAPSHOT_KIND: &str = "snapshot";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("source '{source_name}': invalid {field}: {reason}")]
    Source {
        source_name: String,
        field: String,
        reason: String,
    },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub destination: DestinationSettings,

    /// Sources, reconciled concurrently.
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DestinationSettings {
    /// Ownership tag. Only objects carrying it are ever pruned.
    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default = "default_remove_orphans")]
    pub remove_orphans: bool,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            remove_orphans: default_remove_orphans(),
        }
    }
}

fn default_tag() -> String {
    "netsync".into()
}
fn default_remove_orphans() -> bool {
    true
}
fn default_kind() -> String {
    SNAPSHOT_KIND.into()
}

/// One `[[sources]]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSettings {
    pub name: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    /// Snapshot file; relative paths resolve against the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Role given to devices no host-role rule matches.
    #[serde(default)]
    pub role: DefaultRole,

    /// Manufacturer for device records that do not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default)]
    pub ignore_serial_numbers: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_site: Option<String>,

    #[serde(default)]
    pub permitted_subnets: Vec<String>,

    #[serde(default)]
    pub ignored_subnets: Vec<String>,

    // Relation lists, each entry `"<regex> = <value>"`.
    #[serde(default)]
    pub host_tenant_relations: Vec<String>,
    #[serde(default)]
    pub host_role_relations: Vec<String>,
    #[serde(default)]
    pub host_site_relations: Vec<String>,
    #[serde(default)]
    pub vlan_site_relations: Vec<String>,
    #[serde(default)]
    pub vlan_group_relations: Vec<String>,
    #[serde(default)]
    pub vlan_group_site_relations: Vec<String>,
    #[serde(default)]
    pub vlan_tenant_relations: Vec<String>,
}

impl SourceSettings {
    /// A snapshot source with every optional setting left empty.
    pub fn snapshot(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: default_kind(),
            path: Some(path.into()),
            role: DefaultRole::default(),
            manufacturer: None,
            ignore_serial_numbers: false,
            default_site: None,
            permitted_subnets: Vec::new(),
            ignored_subnets: Vec::new(),
            host_tenant_relations: Vec::new(),
            host_role_relations: Vec::new(),
            host_site_relations: Vec::new(),
            vlan_site_relations: Vec::new(),
            vlan_group_relations: Vec::new(),
            vlan_group_site_relations: Vec::new(),
            vlan_tenant_relations: Vec::new(),
        }
    }

    /// Snapshot path, joined onto `base` when relative.
    pub fn resolved_path(&self, base: Option<&Path>) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        match base {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path.clone()),
        }
    }

    /// Compile this table into a runtime policy.
    pub fn to_policy(&self) -> Result<SourcePolicy, ConfigError> {
        if self.kind != SNAPSHOT_KIND {
            return Err(self.invalid(
                "kind",
                format!("unknown source kind '{}', expected '{SNAPSHOT_KIND}'", self.kind),
            ));
        }
        if self.path.is_none() {
            return Err(self.invalid("path", "required for snapshot sources"));
        }

        let subnets = |field: &str, entries: &[String]| {
            parse_subnets(entries).map_err(|e| self.invalid(field, e.to_string()))
        };
        let rules = |field: &str, entries: &[String]| {
            RegexRelations::parse(entries).map_err(|e| self.invalid(field, e.to_string()))
        };

        let mut policy = SourcePolicy::new(self.name.trim());
        policy.default_role = self.role;
        policy.manufacturer = non_empty(self.manufacturer.as_deref());
        policy.ignore_serial_numbers = self.ignore_serial_numbers;
        policy.default_site = non_empty(self.default_site.as_deref());
        policy.permitted_subnets = subnets("permitted_subnets", &self.permitted_subnets)?;
        policy.ignored_subnets = subnets("ignored_subnets", &self.ignored_subnets)?;
        policy.relations = RelationRules {
            host_tenant: rules("host_tenant_relations", &self.host_tenant_relations)?,
            host_role: rules("host_role_relations", &self.host_role_relations)?,
            host_site: rules("host_site_relations", &self.host_site_relations)?,
            vlan_site: rules("vlan_site_relations", &self.vlan_site_relations)?,
            vlan_group: rules("vlan_group_relations", &self.vlan_group_relations)?,
            vlan_group_site: rules("vlan_group_site_relations", &self.vlan_group_site_relations)?,
            vlan_tenant: rules("vlan_tenant_relations", &self.vlan_tenant_relations)?,
        };
        Ok(policy)
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::Source {
            source_name: self.name.clone(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl Config {
    /// Validate the whole file and compile one policy per source, in
    /// declaration order.
    pub fn validate(&self) -> Result<Vec<SourcePolicy>, ConfigError> {
        if self.destination.tag.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "destination.tag".into(),
                reason: "must not be empty".into(),
            });
        }

        let mut seen = HashSet::new();
        let mut policies = Vec::with_capacity(self.sources.len());
        for (i, source) in self.sources.iter().enumerate() {
            let name = source.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("sources[{i}].name"),
                    reason: "must not be empty".into(),
                });
            }
            if !seen.insert(name) {
                return Err(ConfigError::Validation {
                    field: format!("sources[{i}].name"),
                    reason: format!("duplicate source name '{name}'"),
                });
            }
            policies.push(source.to_policy()?);
        }
        Ok(policies)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "netsync", "netsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from defaults, file and environment.
///
/// An explicit `path` must exist; the default location may be absent, in
/// which case only defaults and environment apply. Nested keys are
/// separated by `__` in variable names, e.g. `NETSYNC_DESTINATION__TAG`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("NETSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Serialize config back to TOML, as the run will see it.
pub fn render_config(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

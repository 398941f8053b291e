// ── Common building blocks shared by every inventory object ──

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter};

// ── Custom field names ──────────────────────────────────────────────

/// Name of the source that created the object.
pub const CUSTOM_FIELD_SOURCE: &str = "source";
/// The source system's native identifier for the object.
pub const CUSTOM_FIELD_SOURCE_ID: &str = "source_id";
pub const CUSTOM_FIELD_HOST_CPU_CORES: &str = "host_cpu_cores";
pub const CUSTOM_FIELD_HOST_MEMORY: &str = "host_memory";
pub const CUSTOM_FIELD_ARP_ENTRY: &str = "arp_entry";
pub const CUSTOM_FIELD_DEVICE_UUID: &str = "device_uuid";

// ── RemoteId ────────────────────────────────────────────────────────

/// Identifier assigned by the destination system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(u64);

impl RemoteId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RemoteId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

// ── ObjectKind ──────────────────────────────────────────────────────

/// Every entity kind held by the inventory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
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
}

impl ObjectKind {
    /// Deletion order: dependents before the objects they reference.
    pub const PRUNE_ORDER: [Self; 16] = [
        Self::IpAddress,
        Self::Prefix,
        Self::Interface,
        Self::Vlan,
        Self::VlanGroup,
        Self::Device,
        Self::Cluster,
        Self::ClusterGroup,
        Self::ClusterType,
        Self::DeviceType,
        Self::Platform,
        Self::DeviceRole,
        Self::Manufacturer,
        Self::Tenant,
        Self::Site,
        Self::CustomField,
    ];

    /// Load order: referenced objects before their dependents.
    pub fn load_order() -> impl Iterator<Item = Self> {
        Self::PRUNE_ORDER.into_iter().rev()
    }
}

// ── ObjectMeta ──────────────────────────────────────────────────────

/// Metadata carried by every destination object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMeta {
    /// Assigned by the destination once the object exists remotely.
    pub id: Option<RemoteId>,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub custom_fields: BTreeMap<String, Value>,
}

impl ObjectMeta {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn custom_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(name.to_owned(), value.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn source_id(&self) -> Option<&str> {
        self.custom_fields
            .get(CUSTOM_FIELD_SOURCE_ID)
            .and_then(Value::as_str)
    }

    /// Fold a newer candidate's metadata into this one.
    ///
    /// The remote id is kept, tags are unioned, and custom fields are merged
    /// key by key: a candidate value wins unless it is null or an empty string.
    pub fn merge(&mut self, candidate: Self) {
        if self.id.is_none() {
            self.id = candidate.id;
        }
        merge_string(&mut self.description, candidate.description);
        self.tags.extend(candidate.tags);
        for (name, value) in candidate.custom_fields {
            if is_blank(&value) {
                self.custom_fields.entry(name).or_insert(value);
            } else {
                self.custom_fields.insert(name, value);
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ── Merge helpers ───────────────────────────────────────────────────

pub(crate) fn merge_string(current: &mut String, candidate: String) {
    if !candidate.is_empty() {
        *current = candidate;
    }
}

pub(crate) fn merge_option<T>(current: &mut Option<T>, candidate: Option<T>) {
    if candidate.is_some() {
        *current = candidate;
    }
}

pub(crate) fn merge_vec<T>(current: &mut Vec<T>, candidate: Vec<T>) {
    if !candidate.is_empty() {
        *current = candidate;
    }
}

/// Join natural-key components into a single index key.
pub(crate) fn composite_key(parts: &[&str]) -> String {
    parts.join("|")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn merge_prefers_non_empty_candidate_custom_fields() {
        let mut a = ObjectMeta::default()
            .custom_field("owner", "alice")
            .custom_field("rack", "r1");
        let b = ObjectMeta::default()
            .custom_field("owner", "bob")
            .custom_field("rack", "");
        a.merge(b);

        assert_eq!(a.custom_fields["owner"], json!("bob"));
        assert_eq!(a.custom_fields["rack"], json!("r1"));
    }

    #[test]
    fn merge_null_never_overwrites() {
        let mut a = ObjectMeta::default().custom_field("cores", 8);
        a.merge(ObjectMeta::default().custom_field("cores", Value::Null));
        assert_eq!(a.custom_fields["cores"], json!(8));
    }

    #[test]
    fn merge_unions_tags_and_keeps_id() {
        let mut a = ObjectMeta::with_tags(["netsync"]);
        a.id = Some(RemoteId::new(7));
        let mut b = ObjectMeta::with_tags(["fmc"]).description("edge firewall");
        b.id = Some(RemoteId::new(9));
        a.merge(b);

        assert_eq!(a.id, Some(RemoteId::new(7)));
        assert!(a.has_tag("netsync") && a.has_tag("fmc"));
        assert_eq!(a.description, "edge firewall");
    }

    #[test]
    fn empty_description_keeps_previous() {
        let mut a = ObjectMeta::default().description("core");
        a.merge(ObjectMeta::default());
        assert_eq!(a.description, "core");
    }

    #[test]
    fn prune_order_covers_every_kind_once() {
        use strum::IntoEnumIterator;
        let mut ordered = ObjectKind::PRUNE_ORDER.to_vec();
        ordered.sort();
        let mut all: Vec<_> = ObjectKind::iter().collect();
        all.sort();
        assert_eq!(ordered, all);
    }

    #[test]
    fn ip_addresses_pruned_before_interfaces_before_devices() {
        let pos = |k| ObjectKind::PRUNE_ORDER.iter().position(|x| *x == k).unwrap();
        assert!(pos(ObjectKind::IpAddress) < pos(ObjectKind::Interface));
        assert!(pos(ObjectKind::Interface) < pos(ObjectKind::Device));
        assert!(pos(ObjectKind::Device) < pos(ObjectKind::Site));
    }

    #[test]
    fn object_kind_display_is_snake_case() {
        assert_eq!(ObjectKind::IpAddress.to_string(), "ip_address");
        assert_eq!(ObjectKind::VlanGroup.to_string(), "vlan_group");
    }
}

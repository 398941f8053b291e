// ── Tenancy, virtualization and custom-field definitions ──

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::common::{ObjectKind, ObjectMeta, merge_option, merge_string, merge_vec};
use super::dcim::Site;
use super::object::{same_opt_ref, same_ref};

#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterType {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGroup {
    pub meta: ObjectMeta,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub meta: ObjectMeta,
    pub name: String,
    pub cluster_type: Arc<ClusterType>,
    pub group: Option<Arc<ClusterGroup>>,
    pub site: Option<Arc<Site>>,
    pub tenant: Option<Arc<Tenant>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CustomFieldType {
    Text,
    Integer,
    Boolean,
    Json,
}

/// Definition of a custom field on the destination system.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    pub meta: ObjectMeta,
    pub name: String,
    pub label: String,
    pub field_type: CustomFieldType,
    /// Object kinds the field is attached to.
    pub object_kinds: Vec<ObjectKind>,
}

impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && self.name == other.name
            && same_ref(&self.cluster_type, &other.cluster_type)
            && same_opt_ref(self.group.as_ref(), other.group.as_ref())
            && same_opt_ref(self.site.as_ref(), other.site.as_ref())
            && same_opt_ref(self.tenant.as_ref(), other.tenant.as_ref())
    }
}

impl Tenant {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
    }
}

impl ClusterType {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
    }
}

impl ClusterGroup {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.slug, candidate.slug);
    }
}

impl Cluster {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        self.cluster_type = candidate.cluster_type;
        merge_option(&mut self.group, candidate.group);
        merge_option(&mut self.site, candidate.site);
        merge_option(&mut self.tenant, candidate.tenant);
    }
}

impl CustomField {
    pub fn key(&self) -> String {
        self.name.clone()
    }

    pub(crate) fn merge(&mut self, candidate: Self) {
        self.meta.merge(candidate.meta);
        merge_string(&mut self.label, candidate.label);
        self.field_type = candidate.field_type;
        merge_vec(&mut self.object_kinds, candidate.object_kinds);
    }
}

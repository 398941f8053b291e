// ── Relation resolution ──
//
// Maps host and VLAN names onto tenants, sites, roles and VLAN groups using
// a source's rule lists, falling back to the source's defaults. Every
// matched name is get-or-created through the inventory.

use std::sync::Arc;

use tracing::debug;

use crate::config::SourcePolicy;
use crate::error::CoreError;
use crate::model::{DeviceRole, MAX_VID, MIN_VID, ObjectMeta, Site, Tenant, VlanGroup};
use crate::store::Inventory;
use crate::util::slugify;

/// Colour of roles created from host-role rules.
const MATCHED_ROLE_COLOR: &str = "9e9e9e";

pub struct RelationResolver<'a> {
    inventory: &'a Inventory,
    policy: &'a SourcePolicy,
}

impl<'a> RelationResolver<'a> {
    pub fn new(inventory: &'a Inventory, policy: &'a SourcePolicy) -> Self {
        Self { inventory, policy }
    }

    fn meta(&self) -> ObjectMeta {
        ObjectMeta::with_tags(self.policy.source_tags())
    }

    // ── Hosts ────────────────────────────────────────────────────────

    pub async fn host_tenant(&self, host: &str) -> Result<Option<Arc<Tenant>>, CoreError> {
        match self.policy.relations.host_tenant.match_value(host) {
            Some(name) => self.tenant(name).await.map(Some),
            None => Ok(None),
        }
    }

    /// Role from the first matching rule, else the source's default role.
    pub async fn host_role(&self, host: &str) -> Result<Arc<DeviceRole>, CoreError> {
        let Some(name) = self.policy.relations.host_role.match_value(host) else {
            return self
                .inventory
                .add_default_device_role(self.policy.default_role)
                .await;
        };
        self.inventory
            .add_device_role(DeviceRole {
                meta: self.meta(),
                name: name.to_owned(),
                slug: slugify(name),
                color: MATCHED_ROLE_COLOR.to_owned(),
                vm_role: false,
            })
            .await
    }

    pub async fn host_site(&self, host: &str) -> Result<Option<Arc<Site>>, CoreError> {
        let matched = self.policy.relations.host_site.match_value(host);
        self.site_or_default(matched).await
    }

    // ── VLANs ────────────────────────────────────────────────────────

    pub async fn vlan_site(&self, vlan: &str) -> Result<Option<Arc<Site>>, CoreError> {
        let matched = self.policy.relations.vlan_site.match_value(vlan);
        self.site_or_default(matched).await
    }

    /// Group for `vlan`, given the site the VLAN already resolved to.
    ///
    /// Candidate groups come from the group rules in order. A group that
    /// `vlan_group_site` scopes to a site other than `site` is skipped; a
    /// group with no scope rule is global.
    pub async fn vlan_group(
        &self,
        vlan: &str,
        site: Option<&Arc<Site>>,
    ) -> Result<Option<Arc<VlanGroup>>, CoreError> {
        let relations = &self.policy.relations;
        let vlan_site = site.map(|s| s.name.as_str());

        for group in relations.vlan_group.matching_values(vlan) {
            let scope = relations.vlan_group_site.match_value(group);
            let group_site = match scope {
                None => None,
                Some(scope) if Some(scope) == vlan_site => site.cloned(),
                Some(scope) => {
                    debug!(vlan, group, scope, ?vlan_site, "vlan group scoped to another site");
                    continue;
                }
            };

            let group = self
                .inventory
                .add_vlan_group(VlanGroup {
                    meta: self.meta(),
                    name: group.to_owned(),
                    slug: slugify(group),
                    site: group_site,
                    min_vid: MIN_VID,
                    max_vid: MAX_VID,
                })
                .await?;
            return Ok(Some(group));
        }
        Ok(None)
    }

    pub async fn vlan_tenant(&self, vlan: &str) -> Result<Option<Arc<Tenant>>, CoreError> {
        match self.policy.relations.vlan_tenant.match_value(vlan) {
            Some(name) => self.tenant(name).await.map(Some),
            None => Ok(None),
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn tenant(&self, name: &str) -> Result<Arc<Tenant>, CoreError> {
        self.inventory
            .add_tenant(Tenant {
                meta: self.meta(),
                name: name.to_owned(),
                slug: slugify(name),
            })
            .await
    }

    async fn site_or_default(&self, matched: Option<&str>) -> Result<Option<Arc<Site>>, CoreError> {
        let Some(name) = matched.or(self.policy.default_site.as_deref()) else {
            return Ok(None);
        };
        let site = self
            .inventory
            .add_site(Site {
                meta: self.meta(),
                name: name.to_owned(),
                slug: slugify(name),
            })
            .await?;
        Ok(Some(site))
    }
}

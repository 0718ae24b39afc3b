//! Cost-center provisioning
//!
//! Resolves cost-center names to billing ids, creating missing cost
//! centers on demand. Creation conflicts are resolved from the 409
//! response body when it carries the existing id, falling back to a
//! fresh listing. A name that only exists on a deleted cost center is
//! an operator problem the tool cannot fix, so it surfaces as an error
//! instead of silently re-creating.

use std::collections::BTreeMap;
use std::sync::Arc;

use costsync_domain::{Budget, CostsyncError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ports::{BillingApi, MappingCache};

/// Cost-center ids are UUIDs; conflict bodies embed the existing id.
static CONFLICT_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("CONFLICT_UUID should compile - this is a bug")
});

/// Pull the existing cost-center id out of a 409 response body.
fn extract_conflict_id(body: &str) -> Option<String> {
    CONFLICT_UUID
        .find(body)
        .map(|m| m.as_str().to_string())
        .filter(|candidate| Uuid::parse_str(candidate).is_ok())
}

/// Resolves cost-center names to ids, creating them when allowed.
pub struct Provisioner {
    api: Arc<dyn BillingApi>,
    cache: Arc<dyn MappingCache>,
}

impl Provisioner {
    pub fn new(api: Arc<dyn BillingApi>, cache: Arc<dyn MappingCache>) -> Self {
        Self { api, cache }
    }

    /// Resolve a name to an id without ever creating. Cache first,
    /// then the active listing.
    pub async fn lookup(&self, name: &str) -> Result<Option<String>> {
        if let Some(id) = self.cache.get(name) {
            debug!(cost_center = %name, "resolved from cache");
            return Ok(Some(id));
        }
        let found = self.find_active(name).await?;
        if let Some(id) = &found {
            self.cache.set(name, id);
        }
        Ok(found)
    }

    /// Resolve a name to an id, creating the cost center if no active
    /// one carries the name.
    pub async fn ensure_exists(&self, name: &str) -> Result<String> {
        if let Some(id) = self.cache.get(name) {
            debug!(cost_center = %name, "resolved from cache");
            return Ok(id);
        }
        if let Some(id) = self.find_active(name).await? {
            self.cache.set(name, &id);
            return Ok(id);
        }
        self.create_or_resolve(name).await
    }

    /// Bulk variant of [`ensure_exists`](Self::ensure_exists): consult
    /// a preloaded name-to-id map instead of listing per name. Newly
    /// learned ids are written back into the map.
    pub async fn ensure_exists_with(
        &self,
        name: &str,
        known: &mut BTreeMap<String, String>,
    ) -> Result<String> {
        if let Some(id) = known.get(name) {
            return Ok(id.clone());
        }
        let id = self.create_or_resolve(name).await?;
        known.insert(name.to_string(), id.clone());
        Ok(id)
    }

    /// Fetch every active cost center once and return the name-to-id
    /// map, warming the cache along the way.
    pub async fn preload_active(&self) -> Result<BTreeMap<String, String>> {
        let centers = self.api.cost_centers().await?;
        let mut known = BTreeMap::new();
        for center in centers.into_iter().filter(|cc| cc.is_active()) {
            self.cache.set(&center.name, &center.id);
            known.insert(center.name, center.id);
        }
        info!(count = known.len(), "preloaded active cost centers");
        Ok(known)
    }

    /// Make sure a zero-amount blocking budget covers the cost center.
    /// Returns `true` when one was created.
    ///
    /// Existing budgets are matched by cost-center NAME: the billing
    /// API stores the name as the budget's entity name even though
    /// creation submits the id.
    pub async fn ensure_budget(
        &self,
        cost_center_id: &str,
        cost_center_name: &str,
        existing: &[Budget],
    ) -> Result<bool> {
        let covered = existing.iter().any(|budget| {
            budget.budget_scope == "cost_center" && budget.budget_entity_name == cost_center_name
        });
        if covered {
            debug!(cost_center = %cost_center_name, "budget already present");
            return Ok(false);
        }
        self.api.create_budget(cost_center_id).await?;
        info!(cost_center = %cost_center_name, "created zero-amount blocking budget");
        Ok(true)
    }

    async fn find_active(&self, name: &str) -> Result<Option<String>> {
        let centers = self.api.cost_centers().await?;
        Ok(centers
            .into_iter()
            .find(|cc| cc.is_active() && cc.name == name)
            .map(|cc| cc.id))
    }

    async fn create_or_resolve(&self, name: &str) -> Result<String> {
        match self.api.create_cost_center(name).await {
            Ok(id) => {
                info!(cost_center = %name, id = %id, "created cost center");
                self.cache.set(name, &id);
                Ok(id)
            }
            Err(CostsyncError::Conflict(body)) => {
                warn!(cost_center = %name, "creation conflicted with an existing cost center");
                if let Some(id) = extract_conflict_id(&body) {
                    debug!(cost_center = %name, id = %id, "resolved id from conflict body");
                    self.cache.set(name, &id);
                    return Ok(id);
                }
                let centers = self.api.cost_centers().await?;
                if let Some(center) =
                    centers.iter().find(|cc| cc.is_active() && cc.name == name)
                {
                    self.cache.set(name, &center.id);
                    return Ok(center.id.clone());
                }
                if centers.iter().any(|cc| cc.name == name) {
                    return Err(CostsyncError::NotFound(format!(
                        "cost center '{name}' exists only in deleted state; \
                         restore it or choose a different name"
                    )));
                }
                Err(CostsyncError::Api(format!(
                    "creation of cost center '{name}' conflicted \
                     but no cost center carries that name"
                )))
            }
            Err(err) => Err(err),
        }
    }
}

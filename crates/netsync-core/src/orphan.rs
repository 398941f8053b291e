// ── Orphan tracking ──
//
// Ownership is the set of remote ids this system manages; liveness is the
// subset touched during the current pass. Whatever is owned but not live
// after every source has finished is an orphan.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::destination::Destination;
use crate::model::{ObjectKind, RemoteId};

/// An orphan the destination refused to delete.
#[derive(Debug, Clone, Serialize)]
pub struct OrphanFailure {
    pub kind: ObjectKind,
    pub id: RemoteId,
    pub error: String,
}

/// Outcome of one prune.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub deleted: Vec<(ObjectKind, RemoteId)>,
    pub failed: Vec<OrphanFailure>,
}

impl PruneReport {
    pub fn deleted_of(&self, kind: ObjectKind) -> usize {
        self.deleted.iter().filter(|(k, _)| *k == kind).count()
    }
}

#[derive(Debug, Default)]
pub struct OrphanManager {
    managed: DashMap<ObjectKind, HashSet<RemoteId>>,
    present: DashMap<ObjectKind, HashSet<RemoteId>>,
}

impl OrphanManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim ownership of an object.
    pub fn register(&self, kind: ObjectKind, id: RemoteId) {
        self.managed.entry(kind).or_default().insert(id);
    }

    /// Mark an object as referenced during this pass.
    pub fn mark_present(&self, kind: ObjectKind, id: RemoteId) {
        self.present.entry(kind).or_default().insert(id);
    }

    /// Start a new pass: nothing counts as present until touched again.
    pub fn reset_presence(&self) {
        self.present.clear();
    }

    pub fn is_managed(&self, kind: ObjectKind, id: RemoteId) -> bool {
        self.managed.get(&kind).is_some_and(|ids| ids.contains(&id))
    }

    /// Managed ids of `kind` not marked present, in ascending order.
    pub fn pending(&self, kind: ObjectKind) -> Vec<RemoteId> {
        let Some(managed) = self.managed.get(&kind) else {
            return Vec::new();
        };
        let present = self.present.get(&kind);
        let mut ids: Vec<RemoteId> = managed
            .iter()
            .filter(|id| !present.as_ref().is_some_and(|p| p.contains(*id)))
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn pending_count(&self) -> usize {
        ObjectKind::PRUNE_ORDER
            .iter()
            .map(|kind| self.pending(*kind).len())
            .sum()
    }

    fn forget(&self, kind: ObjectKind, id: RemoteId) {
        if let Some(mut ids) = self.managed.get_mut(&kind) {
            ids.remove(&id);
        }
    }

    /// Delete every pending object, dependents first.
    ///
    /// A failed deletion is recorded and the prune moves on. `evict` is
    /// called for every object the destination confirmed deleted.
    pub async fn prune<F>(&self, destination: &dyn Destination, mut evict: F) -> PruneReport
    where
        F: FnMut(ObjectKind, RemoteId) + Send,
    {
        let mut report = PruneReport::default();

        for kind in ObjectKind::PRUNE_ORDER {
            let pending = self.pending(kind);
            if pending.is_empty() {
                continue;
            }
            debug!(%kind, count = pending.len(), "pruning orphans");

            for id in pending {
                match destination.delete(kind, id).await {
                    Ok(()) => {
                        self.forget(kind, id);
                        evict(kind, id);
                        report.deleted.push((kind, id));
                    }
                    Err(e) => {
                        warn!(%kind, %id, error = %e, "failed to delete orphan");
                        report.failed.push(OrphanFailure {
                            kind,
                            id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "orphan prune complete"
        );
        report
    }
}

// ── In-memory destination ──
//
// Keeps objects in a concurrent map and journals every write. Used for
// dry-run planning and as the destination in tests; failures can be
// injected per natural key or per remote id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use strum::Display;

use super::Destination;
use crate::error::DestinationError;
use crate::model::{AnyObject, ObjectKind, RemoteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

/// One journaled write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub op: OperationKind,
    pub kind: ObjectKind,
    pub id: RemoteId,
    pub key: String,
}

#[derive(Debug)]
pub struct MemoryDestination {
    objects: DashMap<RemoteId, AnyObject>,
    next_id: AtomicU64,
    journal: Mutex<Vec<Operation>>,
    failing_keys: DashSet<(ObjectKind, String)>,
    failing_deletes: DashSet<RemoteId>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            next_id: AtomicU64::new(1),
            journal: Mutex::new(Vec::new()),
            failing_keys: DashSet::new(),
            failing_deletes: DashSet::new(),
        }
    }

    /// Store a pre-existing object without journaling it. Returns its id.
    pub fn seed(&self, mut object: AnyObject) -> RemoteId {
        let id = object.meta().id.unwrap_or_else(|| self.allocate_id());
        object.meta_mut().id = Some(id);
        self.objects.insert(id, object);
        id
    }

    /// Make every create/update of `(kind, key)` fail.
    pub fn fail_writes_for(&self, kind: ObjectKind, key: impl Into<String>) {
        self.failing_keys.insert((kind, key.into()));
    }

    pub fn fail_delete_of(&self, id: RemoteId) {
        self.failing_deletes.insert(id);
    }

    pub fn get(&self, id: RemoteId) -> Option<AnyObject> {
        self.objects.get(&id).map(|r| r.value().clone())
    }

    pub fn contains(&self, id: RemoteId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of stored objects of `kind`.
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|r| r.value().kind() == kind).count()
    }

    pub fn find(&self, kind: ObjectKind, key: &str) -> Option<AnyObject> {
        self.objects
            .iter()
            .find(|r| r.value().kind() == kind && r.value().key() == key)
            .map(|r| r.value().clone())
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Journaled writes of `op` against `kind`.
    pub fn operation_count(&self, op: OperationKind, kind: ObjectKind) -> usize {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|o| o.op == op && o.kind == kind)
            .count()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn allocate_id(&self) -> RemoteId {
        RemoteId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, op: OperationKind, kind: ObjectKind, id: RemoteId, key: String) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Operation { op, kind, id, key });
    }

    fn check_writable(&self, object: &AnyObject) -> Result<(), DestinationError> {
        if self.failing_keys.contains(&(object.kind(), object.key())) {
            return Err(DestinationError::Rejected {
                message: format!("write of {} '{}' refused", object.kind(), object.key()),
            });
        }
        Ok(())
    }
}

impl Default for MemoryDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn list(&self, kind: ObjectKind) -> Result<Vec<AnyObject>, DestinationError> {
        let mut objects: Vec<AnyObject> = self
            .objects
            .iter()
            .filter(|r| r.value().kind() == kind)
            .map(|r| r.value().clone())
            .collect();
        objects.sort_by_key(|o| o.meta().id);
        Ok(objects)
    }

    async fn create(&self, object: &AnyObject) -> Result<RemoteId, DestinationError> {
        self.check_writable(object)?;
        let kind = object.kind();
        let key = object.key();
        if let Some(id) = self.find(kind, &key).and_then(|existing| existing.meta().id) {
            return Ok(id);
        }

        let id = self.allocate_id();
        let mut stored = object.clone();
        stored.meta_mut().id = Some(id);
        self.objects.insert(id, stored);
        self.record(OperationKind::Create, kind, id, key);
        Ok(id)
    }

    async fn update(&self, id: RemoteId, object: &AnyObject) -> Result<(), DestinationError> {
        self.check_writable(object)?;
        let kind = object.kind();
        let Some(mut slot) = self.objects.get_mut(&id) else {
            return Err(DestinationError::NotFound { kind, id });
        };
        let mut stored = object.clone();
        stored.meta_mut().id = Some(id);
        *slot = stored;
        drop(slot);
        self.record(OperationKind::Update, kind, id, object.key());
        Ok(())
    }

    async fn delete(&self, kind: ObjectKind, id: RemoteId) -> Result<(), DestinationError> {
        if self.failing_deletes.contains(&id) {
            return Err(DestinationError::Rejected {
                message: format!("{kind} {id} is still referenced"),
            });
        }
        let Some((_, removed)) = self.objects.remove(&id) else {
            return Err(DestinationError::NotFound { kind, id });
        };
        self.record(OperationKind::Delete, kind, id, removed.key());
        Ok(())
    }
}

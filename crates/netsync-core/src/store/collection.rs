// ── Keyed object index ──
//
// Lock-free concurrent storage with O(1) lookups by natural key and by
// remote id. Writers that must make lookup + remote call + insert atomic
// take the index's write gate first; readers never do.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::CoreError;
use crate::model::{AnyObject, InventoryObject, RemoteId};

/// Concurrent index for a single object kind.
pub(crate) struct ObjectIndex<T: InventoryObject> {
    /// Primary storage: natural key -> object.
    by_key: DashMap<String, Arc<T>>,

    /// Secondary index: remote id -> natural key.
    id_to_key: DashMap<RemoteId, String>,

    /// Reverse of `id_to_key` for efficient removal.
    key_to_id: DashMap<String, RemoteId>,

    /// Serialises get-or-create for this kind.
    gate: Mutex<()>,
}

impl<T: InventoryObject> ObjectIndex<T> {
    pub(crate) fn new() -> Self {
        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
            gate: Mutex::new(()),
        }
    }

    /// Acquire the write gate. Held across the remote call of an upsert.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Insert or replace an object. Returns `true` if the key was new.
    pub(crate) fn insert(&self, key: String, object: Arc<T>) -> bool {
        let id = object.meta().id;

        // Clean up stale id mapping if the key already existed with a different id.
        if let Some(old_id) = self.key_to_id.get(&key).map(|r| *r.value()) {
            if Some(old_id) != id {
                self.id_to_key.remove(&old_id);
                self.key_to_id.remove(&key);
            }
        }

        let is_new = self.by_key.insert(key.clone(), object).is_none();
        if let Some(id) = id {
            self.id_to_key.insert(id, key.clone());
            self.key_to_id.insert(key, id);
        }
        is_new
    }

    /// Evict an object by remote id. Returns the evicted object if present.
    pub(crate) fn remove_by_id(&self, id: RemoteId) -> Option<Arc<T>> {
        let (_, key) = self.id_to_key.remove(&id)?;
        self.key_to_id.remove(&key);
        self.by_key.remove(&key).map(|(_, v)| v)
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn get_by_id(&self, id: RemoteId) -> Option<Arc<T>> {
        let key = self.id_to_key.get(&id)?;
        self.by_key
            .get(key.value().as_str())
            .map(|r| Arc::clone(r.value()))
    }

    /// All current objects, in no particular order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.by_key.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Kind-erased view of an index, used by bootstrap and orphan eviction.
pub(crate) trait ErasedIndex: Send + Sync {
    /// Index an object listed from the destination.
    fn insert_any(&self, object: AnyObject) -> Result<bool, CoreError>;

    fn evict(&self, id: RemoteId) -> bool;

    fn count(&self) -> usize;

    fn get_any(&self, id: RemoteId) -> Option<AnyObject>;

    fn snapshot_any(&self) -> Vec<AnyObject>;
}

impl<T: InventoryObject> ErasedIndex for ObjectIndex<T> {
    fn insert_any(&self, object: AnyObject) -> Result<bool, CoreError> {
        let found = object.kind();
        let object = T::from_any(object).ok_or_else(|| {
            CoreError::Internal(format!("{found} object offered to the {} index", T::KIND))
        })?;
        Ok(self.insert(object.key(), Arc::new(object)))
    }

    fn evict(&self, id: RemoteId) -> bool {
        self.remove_by_id(id).is_some()
    }

    fn count(&self) -> usize {
        self.len()
    }

    fn get_any(&self, id: RemoteId) -> Option<AnyObject> {
        self.get_by_id(id).map(|object| object.to_any())
    }

    fn snapshot_any(&self) -> Vec<AnyObject> {
        self.by_key.iter().map(|r| r.value().to_any()).collect()
    }
}

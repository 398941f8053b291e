// ── Destination inventory client ──
//
// The reconciliation core never speaks HTTP. Everything it needs from the
// destination system goes through this trait; a REST client implements it
// outside this crate, `MemoryDestination` implements it in-process.

mod memory;

use async_trait::async_trait;

use crate::error::DestinationError;
use crate::model::{AnyObject, ObjectKind, RemoteId};

pub use memory::{MemoryDestination, Operation, OperationKind};

/// Remote operations the core relies on.
///
/// Implementations own transport concerns: retries, timeouts, TLS and
/// authentication. Every call is treated as complete once it returns.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Every existing object of `kind`, with remote ids populated.
    async fn list(&self, kind: ObjectKind) -> Result<Vec<AnyObject>, DestinationError>;

    /// Get-or-create by natural key; returns the remote id either way.
    async fn create(&self, object: &AnyObject) -> Result<RemoteId, DestinationError>;

    /// Overwrite the object stored under `id`.
    async fn update(&self, id: RemoteId, object: &AnyObject) -> Result<(), DestinationError>;

    async fn delete(&self, kind: ObjectKind, id: RemoteId) -> Result<(), DestinationError>;
}

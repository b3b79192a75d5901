//! Per-blob existence gate.

use tracing::debug;

use super::require_name;
use crate::context::BlobConnection;
use crate::error::{StorageError, StorageResult};
use crate::models::ContainerHandle;

/// Decides insert-vs-reject and require-then-act for a single blob.
///
/// The check and the following write are separate round trips; the write's
/// outcome is authoritative.
#[derive(Debug, Clone)]
pub struct BlobExistenceGate {
    connection: BlobConnection,
}

impl BlobExistenceGate {
    pub fn new(connection: BlobConnection) -> Self {
        Self { connection }
    }

    async fn exists(&self, container: &ContainerHandle, blob: &str) -> StorageResult<bool> {
        require_name("blob", blob)?;
        let exists = self
            .connection
            .store()
            .blob_exists(container.name(), blob)
            .await?;
        debug!(
            "Blob check: container={} blob={} exists={}",
            container.name(),
            blob,
            exists
        );
        Ok(exists)
    }

    /// Fails with `BlobAlreadyExists` if the blob is present.
    pub async fn require_absent(&self, container: &ContainerHandle, blob: &str) -> StorageResult<()> {
        if self.exists(container, blob).await? {
            return Err(StorageError::blob_already_exists(container.name(), blob));
        }
        Ok(())
    }

    /// Fails with `BlobNotFound` if the blob is absent.
    pub async fn require_present(&self, container: &ContainerHandle, blob: &str) -> StorageResult<()> {
        if !self.exists(container, blob).await? {
            return Err(StorageError::blob_not_found(container.name(), blob));
        }
        Ok(())
    }
}

//! Delete verb.

use tracing::{debug, warn};

use super::{require_name, BlobExistenceGate};
use crate::context::BlobConnection;
use crate::error::StorageResult;
use crate::models::ContainerHandle;

#[derive(Debug, Clone)]
pub struct DeleteBlobService {
    connection: BlobConnection,
    blobs: BlobExistenceGate,
}

impl DeleteBlobService {
    pub fn new(connection: BlobConnection) -> Self {
        Self {
            blobs: BlobExistenceGate::new(connection.clone()),
            connection,
        }
    }

    /// Deletes an existing blob. The container is not gated; a missing
    /// container surfaces as `BlobNotFound`.
    pub async fn execute(&self, container: &str, blob: &str) -> StorageResult<bool> {
        require_name("container", container)?;
        let handle = ContainerHandle::existing(container);
        self.blobs.require_present(&handle, blob).await?;

        match self.connection.store().delete_blob(container, blob).await {
            Ok(()) => {
                debug!("Deleted blob {}/{}", container, blob);
                Ok(true)
            }
            Err(e) => {
                warn!("Delete of {}/{} failed: {}", container, blob, e);
                Ok(false)
            }
        }
    }
}

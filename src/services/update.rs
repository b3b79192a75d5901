//! Update verb: replace an existing blob by delete-then-upload.

use std::path::PathBuf;

use bytes::Bytes;
use tracing::{debug, warn};

use super::{BlobExistenceGate, ContainerGate};
use crate::context::BlobConnection;
use crate::error::{StorageError, StorageResult};
use crate::models::{ByteStream, ContainerHandle, Payload};

#[derive(Debug, Clone)]
pub struct UpdateBlobService {
    connection: BlobConnection,
    containers: ContainerGate,
    blobs: BlobExistenceGate,
}

impl UpdateBlobService {
    pub fn new(connection: BlobConnection) -> Self {
        Self {
            containers: ContainerGate::new(connection.clone()),
            blobs: BlobExistenceGate::new(connection.clone()),
            connection,
        }
    }

    /// Replaces an existing blob with `payload`.
    ///
    /// Never creates the container. The delete and the upload are separate
    /// calls: if the upload fails the blob stays deleted.
    pub async fn execute(
        &self,
        container: &str,
        blob: &str,
        payload: Payload,
        container_must_exist: bool,
    ) -> StorageResult<bool> {
        if !self.containers.check(container, container_must_exist).await? {
            return Err(StorageError::container_not_found(container));
        }
        let handle = ContainerHandle::existing(container);
        self.blobs.require_present(&handle, blob).await?;
        let body = payload.into_body().await?;

        let store = self.connection.store();
        if let Err(e) = store.delete_blob(container, blob).await {
            warn!("Delete before update of {}/{} failed: {}", container, blob, e);
            return Ok(false);
        }

        match store.upload_blob(container, blob, body, true).await {
            Ok(Some(receipt)) => {
                debug!("Updated blob {}/{} etag={}", container, blob, receipt.etag);
                Ok(true)
            }
            Ok(None) => {
                warn!("Re-upload of {}/{} was not acknowledged", container, blob);
                Ok(false)
            }
            Err(e) => {
                warn!("Re-upload of {}/{} failed, blob is now absent: {}", container, blob, e);
                Ok(false)
            }
        }
    }

    pub async fn execute_file(
        &self,
        container: &str,
        blob: &str,
        path: impl Into<PathBuf>,
        container_must_exist: bool,
    ) -> StorageResult<bool> {
        self.execute(container, blob, Payload::file(path), container_must_exist)
            .await
    }

    pub async fn execute_bytes(
        &self,
        container: &str,
        blob: &str,
        data: impl Into<Bytes>,
        container_must_exist: bool,
    ) -> StorageResult<bool> {
        self.execute(container, blob, Payload::bytes(data), container_must_exist)
            .await
    }

    pub async fn execute_stream(
        &self,
        container: &str,
        blob: &str,
        stream: ByteStream,
        container_must_exist: bool,
    ) -> StorageResult<bool> {
        self.execute(container, blob, Payload::Stream(stream), container_must_exist)
            .await
    }
}

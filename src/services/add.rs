//! Add verb: create a blob that must not exist yet.

use std::path::PathBuf;

use bytes::Bytes;
use tracing::{debug, warn};

use super::{BlobExistenceGate, ContainerGate};
use crate::context::BlobConnection;
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{ByteStream, Payload};

#[derive(Debug, Clone)]
pub struct AddBlobService {
    connection: BlobConnection,
    containers: ContainerGate,
    blobs: BlobExistenceGate,
}

impl AddBlobService {
    pub fn new(connection: BlobConnection) -> Self {
        Self {
            containers: ContainerGate::new(connection.clone()),
            blobs: BlobExistenceGate::new(connection.clone()),
            connection,
        }
    }

    /// Uploads `payload` as a new blob.
    ///
    /// With `container_must_exist = false` the container is created and
    /// must not already exist. Returns `Ok(false)` when the upload was
    /// attempted and failed.
    pub async fn execute(
        &self,
        container: &str,
        blob: &str,
        payload: Payload,
        container_must_exist: bool,
    ) -> StorageResult<bool> {
        let handle = self.containers.ensure(container, container_must_exist).await?;
        let body = payload.into_body().await?;
        self.blobs.require_absent(&handle, blob).await?;

        match self
            .connection
            .store()
            .upload_blob(handle.name(), blob, body, false)
            .await
        {
            Ok(Some(receipt)) => {
                debug!("Added blob {}/{} etag={}", container, blob, receipt.etag);
                Ok(true)
            }
            Ok(None) => {
                warn!("Upload of {}/{} was not acknowledged", container, blob);
                Ok(false)
            }
            // The blob appeared between the gate and the conditional write.
            Err(e) if e.code == ErrorCode::BlobAlreadyExists => {
                Err(StorageError::blob_already_exists(container, blob))
            }
            Err(e) => {
                warn!("Upload of {}/{} failed: {}", container, blob, e);
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

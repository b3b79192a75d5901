//! Get verb and blob representations.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{require_name, BlobExistenceGate, ContainerGate};
use crate::context::BlobConnection;
use crate::error::StorageResult;
use crate::models::{BlobStream, ContainerHandle};

/// How a blob is handed back to the caller.
#[async_trait]
pub trait BlobRepresentation: Send + Sync {
    type Output: Send;

    async fn render(
        &self,
        connection: &BlobConnection,
        container: &str,
        blob: &str,
    ) -> StorageResult<Self::Output>;
}

/// The blob's URL under the account endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsUrl;

/// The blob's full content.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsBytes;

/// A lazily-read stream of the blob's content.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsStream;

#[async_trait]
impl BlobRepresentation for AsUrl {
    type Output = String;

    async fn render(
        &self,
        connection: &BlobConnection,
        container: &str,
        blob: &str,
    ) -> StorageResult<String> {
        Ok(connection.blob_url(container, blob))
    }
}

#[async_trait]
impl BlobRepresentation for AsBytes {
    type Output = Bytes;

    async fn render(
        &self,
        connection: &BlobConnection,
        container: &str,
        blob: &str,
    ) -> StorageResult<Bytes> {
        connection.store().download_blob(container, blob).await
    }
}

#[async_trait]
impl BlobRepresentation for AsStream {
    type Output = BlobStream;

    async fn render(
        &self,
        connection: &BlobConnection,
        container: &str,
        blob: &str,
    ) -> StorageResult<BlobStream> {
        connection.store().open_blob_stream(container, blob).await
    }
}

#[derive(Debug, Clone)]
pub struct GetBlobService {
    connection: BlobConnection,
    containers: ContainerGate,
    blobs: BlobExistenceGate,
}

impl GetBlobService {
    pub fn new(connection: BlobConnection) -> Self {
        Self {
            containers: ContainerGate::new(connection.clone()),
            blobs: BlobExistenceGate::new(connection.clone()),
            connection,
        }
    }

    /// Every blob in `container`, keyed by name.
    pub async fn get_all<R>(
        &self,
        container: &str,
        representation: &R,
    ) -> StorageResult<BTreeMap<String, R::Output>>
    where
        R: BlobRepresentation,
    {
        self.containers.check(container, true).await?;

        let names = self.connection.store().list_blobs(container).await?;
        debug!("Listed {} blobs in {}", names.len(), container);

        let mut blobs = BTreeMap::new();
        for name in names {
            let value = representation
                .render(&self.connection, container, &name)
                .await?;
            blobs.insert(name, value);
        }
        Ok(blobs)
    }

    /// A single blob; `BlobNotFound` if absent.
    pub async fn get<R>(
        &self,
        container: &str,
        blob: &str,
        representation: &R,
    ) -> StorageResult<R::Output>
    where
        R: BlobRepresentation,
    {
        require_name("container", container)?;
        self.blobs
            .require_present(&ContainerHandle::existing(container), blob)
            .await?;
        representation.render(&self.connection, container, blob).await
    }
}

//! Blob store contract.

use async_trait::async_trait;
use bytes::Bytes;

use super::RemoteAccount;
use crate::error::StorageResult;
use crate::models::{BlobBody, BlobStream, UploadReceipt};

/// Characters left unencoded in blob paths; `/` separates virtual directories.
pub(crate) const BLOB_NAME_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes a blob name for use in a URL path.
pub(crate) fn encode_blob_name(blob: &str) -> String {
    percent_encoding::utf8_percent_encode(blob, &BLOB_NAME_ENCODE_SET).to_string()
}

/// Remote object store operations consumed by the gates and verb services.
#[async_trait]
pub trait BlobStore: RemoteAccount {
    async fn container_exists(&self, container: &str) -> StorageResult<bool>;

    async fn create_container(&self, container: &str) -> StorageResult<()>;

    async fn blob_exists(&self, container: &str, blob: &str) -> StorageResult<bool>;

    /// Uploads `body` as the blob's full content.
    ///
    /// With `overwrite == false` the write is conditional on the blob being
    /// absent and fails with `BlobAlreadyExists` otherwise. `Ok(None)` means
    /// the store accepted the request without acknowledging it.
    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: BlobBody,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>>;

    async fn delete_blob(&self, container: &str, blob: &str) -> StorageResult<()>;

    /// Names of every blob in the container, in store order.
    async fn list_blobs(&self, container: &str) -> StorageResult<Vec<String>>;

    async fn download_blob(&self, container: &str, blob: &str) -> StorageResult<Bytes>;

    async fn open_blob_stream(&self, container: &str, blob: &str) -> StorageResult<BlobStream>;

    /// Public URL of a blob.
    fn blob_url(&self, container: &str, blob: &str) -> String {
        format!("{}/{}/{}", self.endpoint(), container, encode_blob_name(blob))
    }
}

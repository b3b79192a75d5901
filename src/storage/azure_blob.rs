//! Azure Blob Storage REST client.
//!
//! Buffered bodies are written with a single Put Blob carrying
//! `Content-MD5`. Streamed bodies are cut into blocks, staged with Put
//! Block, and committed with Put Block List, so the whole stream never has
//! to sit in memory. Conditional adds send `If-None-Match: *` on the
//! committing request.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use md5::{Digest, Md5};
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, info};

use super::rest::{error_from_response, header_string, parse_http_date, RestClient};
use super::{encode_blob_name, BlobStore, RemoteAccount};
use crate::config::StorageOptions;
use crate::error::{StorageError, StorageResult};
use crate::models::{BlobBody, BlobStream, ByteStream, UploadReceipt};
use crate::xml::{parse_blob_list, serialize_block_list};

/// Default staged block size for streamed uploads (4 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Blob service client authenticated with the account's shared key.
pub struct AzureBlobClient {
    rest: RestClient,
    block_size: usize,
}

impl AzureBlobClient {
    /// Creates a client for `https://{account}.blob.core.windows.net`, or
    /// the options' blob endpoint override.
    pub fn new(options: &StorageOptions) -> StorageResult<Self> {
        let rest = RestClient::new(options, "blob", options.blob_endpoint.as_deref())?;

        info!(
            "Blob client initialized: account={} endpoint={}",
            rest.account(),
            rest.endpoint()
        );

        Ok(Self {
            rest,
            block_size: DEFAULT_BLOCK_SIZE,
        })
    }

    /// Sets the staged block size used for streamed uploads.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    fn container_path(container: &str) -> String {
        container.to_string()
    }

    fn blob_path(container: &str, blob: &str) -> String {
        format!("{}/{}", container, encode_blob_name(blob))
    }

    /// Block IDs must be base64 and of equal length within a blob.
    fn block_id(upload_id: &str, index: usize) -> String {
        BASE64.encode(format!("{}:{:05}", upload_id, index))
    }

    fn compute_md5(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        BASE64.encode(hasher.finalize())
    }

    fn receipt(response: &Response) -> Option<UploadReceipt> {
        let etag = header_string(response, "etag")?;
        Some(UploadReceipt {
            etag,
            last_modified: header_string(response, "last-modified")
                .as_deref()
                .and_then(parse_http_date),
            content_md5: header_string(response, "content-md5"),
        })
    }

    /// Put Blob with the whole body.
    async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        let mut req = self
            .rest
            .request(Method::PUT, &Self::blob_path(container, blob))
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", "application/octet-stream")
            .header("Content-MD5", Self::compute_md5(&data))
            .body(data);
        if !overwrite {
            req = req.header("If-None-Match", "*");
        }

        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::CREATED {
            return Err(error_from_response("Put Blob", resp).await);
        }
        Ok(Self::receipt(&resp))
    }

    /// Put Block for one staged chunk.
    async fn put_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        let req = self
            .rest
            .request(Method::PUT, &Self::blob_path(container, blob))
            .query(&[("comp", "block"), ("blockid", block_id)])
            .header("Content-MD5", Self::compute_md5(&data))
            .body(data);

        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::CREATED {
            return Err(error_from_response("Put Block", resp).await);
        }
        Ok(())
    }

    /// Put Block List committing the staged blocks.
    async fn put_block_list(
        &self,
        container: &str,
        blob: &str,
        block_ids: &[String],
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        let mut req = self
            .rest
            .request(Method::PUT, &Self::blob_path(container, blob))
            .query(&[("comp", "blocklist")])
            .header("Content-Type", "application/xml")
            .body(serialize_block_list(block_ids));
        if !overwrite {
            req = req.header("If-None-Match", "*");
        }

        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::CREATED {
            return Err(error_from_response("Put Block List", resp).await);
        }
        Ok(Self::receipt(&resp))
    }

    /// Stages `stream` in `block_size` chunks and commits them.
    async fn upload_stream(
        &self,
        container: &str,
        blob: &str,
        mut stream: ByteStream,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        let mut block_ids = Vec::new();
        let mut pending = BytesMut::new();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| StorageError::request_failed(format!("Payload stream failed: {e}")))?;
            pending.extend_from_slice(&chunk);

            while pending.len() >= self.block_size {
                let block = pending.split_to(self.block_size).freeze();
                let id = Self::block_id(&upload_id, block_ids.len());
                self.put_block(container, blob, &id, block).await?;
                block_ids.push(id);
            }
        }

        // Nothing staged: a single Put Blob carries the (possibly empty) tail.
        if block_ids.is_empty() {
            return self
                .put_blob(container, blob, pending.freeze(), overwrite)
                .await;
        }

        if !pending.is_empty() {
            let id = Self::block_id(&upload_id, block_ids.len());
            self.put_block(container, blob, &id, pending.freeze()).await?;
            block_ids.push(id);
        }

        debug!("Committing {} blocks for {}/{}", block_ids.len(), container, blob);
        self.put_block_list(container, blob, &block_ids, overwrite)
            .await
    }

    /// HEAD-style existence probe: 200 means present, 404 absent.
    async fn probe(&self, context: &str, req: reqwest::RequestBuilder) -> StorageResult<bool> {
        let resp = self.rest.send(req).await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(context, resp).await),
        }
    }

    async fn get_blob(&self, container: &str, blob: &str) -> StorageResult<Response> {
        let req = self
            .rest
            .request(Method::GET, &Self::blob_path(container, blob));
        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(error_from_response("Get Blob", resp).await);
        }
        Ok(resp)
    }
}

impl RemoteAccount for AzureBlobClient {
    fn account_name(&self) -> &str {
        self.rest.account()
    }

    fn endpoint(&self) -> &str {
        self.rest.endpoint()
    }
}

#[async_trait]
impl BlobStore for AzureBlobClient {
    async fn container_exists(&self, container: &str) -> StorageResult<bool> {
        let req = self
            .rest
            .request(Method::HEAD, &Self::container_path(container))
            .query(&[("restype", "container")]);
        self.probe("Get Container Properties", req).await
    }

    async fn create_container(&self, container: &str) -> StorageResult<()> {
        let req = self
            .rest
            .request(Method::PUT, &Self::container_path(container))
            .query(&[("restype", "container")])
            .body(Bytes::new());
        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::CREATED {
            return Err(error_from_response("Create Container", resp).await);
        }
        Ok(())
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> StorageResult<bool> {
        let req = self
            .rest
            .request(Method::HEAD, &Self::blob_path(container, blob));
        self.probe("Get Blob Properties", req).await
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: BlobBody,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        match body {
            BlobBody::Bytes(data) => self.put_blob(container, blob, data, overwrite).await,
            BlobBody::Stream(stream) => {
                self.upload_stream(container, blob, stream, overwrite)
                    .await
            }
        }
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> StorageResult<()> {
        let req = self
            .rest
            .request(Method::DELETE, &Self::blob_path(container, blob));
        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::ACCEPTED {
            return Err(error_from_response("Delete Blob", resp).await);
        }
        Ok(())
    }

    async fn list_blobs(&self, container: &str) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut req = self
                .rest
                .request(Method::GET, &Self::container_path(container))
                .query(&[("restype", "container"), ("comp", "list")]);
            if let Some(m) = &marker {
                req = req.query(&[("marker", m.as_str())]);
            }

            let resp = self.rest.send(req).await?;
            if resp.status() != StatusCode::OK {
                return Err(error_from_response("List Blobs", resp).await);
            }
            let body = resp.text().await?;
            let page = parse_blob_list(&body)?;
            names.extend(page.names);

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StorageResult<Bytes> {
        let resp = self.get_blob(container, blob).await?;
        Ok(resp.bytes().await?)
    }

    async fn open_blob_stream(&self, container: &str, blob: &str) -> StorageResult<BlobStream> {
        let resp = self.get_blob(container, blob).await?;
        Ok(resp.bytes_stream().map_err(StorageError::from).boxed())
    }
}

//! In-process blob and queue stores.
//!
//! They follow the remote services' observable behaviour (existence
//! probes, conditional writes, pop-receipt checks) so the gates and verb
//! services can run without a network.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{BlobStore, QueueStore, RemoteAccount};
use crate::config::DEFAULT_ACCOUNT;
use crate::error::{StorageError, StorageResult};
use crate::models::{BlobBody, BlobStream, QueueMessage, UploadReceipt};

/// Key type for blobs - uses Arc<str> to avoid allocations.
type BlobKey = (Arc<str>, Arc<str>);

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

/// In-memory blob store with optimized concurrent access.
pub struct MemoryBlobStore {
    account: String,
    endpoint: String,
    /// Container creation times indexed by name.
    containers: DashMap<Arc<str>, DateTime<Utc>>,
    /// Blobs indexed by (container, name).
    blobs: DashMap<BlobKey, StoredBlob>,
}

impl MemoryBlobStore {
    /// Creates a store for the development account.
    pub fn new() -> Self {
        Self::with_account(
            DEFAULT_ACCOUNT,
            format!("http://127.0.0.1:10000/{DEFAULT_ACCOUNT}"),
        )
    }

    pub fn with_account(account: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            endpoint: endpoint.into(),
            containers: DashMap::new(),
            blobs: DashMap::new(),
        }
    }

    #[inline]
    fn blob_key(container: &str, blob: &str) -> BlobKey {
        (Arc::from(container), Arc::from(blob))
    }

    fn etag() -> String {
        format!("\"0x{}\"", uuid::Uuid::new_v4().simple())
    }

    fn require_container(&self, container: &str) -> StorageResult<()> {
        if self.containers.contains_key(container) {
            Ok(())
        } else {
            Err(StorageError::container_not_found(container).with_status(404))
        }
    }

    fn require_blob(&self, container: &str, blob: &str) -> StorageResult<StoredBlob> {
        self.require_container(container)?;
        self.blobs
            .get(&Self::blob_key(container, blob))
            .map(|b| b.value().clone())
            .ok_or_else(|| StorageError::blob_not_found(container, blob).with_status(404))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the service's container naming rules.
fn validate_container_name(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| {
        StorageError::request_failed(format!("Invalid container name {name}: {reason}"))
            .with_status(400)
    };

    // Service-reserved names skip the character rules.
    if matches!(name, "$root" | "$logs" | "$web") {
        return Ok(());
    }

    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(invalid("must start with a letter or number"));
    }

    if name
        .chars()
        .any(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-')
    {
        return Err(invalid("may only contain lowercase letters, numbers, and hyphens"));
    }

    if name.contains("--") {
        return Err(invalid("cannot have consecutive hyphens"));
    }

    Ok(())
}

impl RemoteAccount for MemoryBlobStore {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn container_exists(&self, container: &str) -> StorageResult<bool> {
        Ok(self.containers.contains_key(container))
    }

    async fn create_container(&self, container: &str) -> StorageResult<()> {
        validate_container_name(container)?;
        match self.containers.entry(Arc::from(container)) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StorageError::container_already_exists(container).with_status(409))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Ok(())
            }
        }
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> StorageResult<bool> {
        Ok(self.blobs.contains_key(&Self::blob_key(container, blob)))
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: BlobBody,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        self.require_container(container)?;
        let data = body.collect().await?;

        let stored = StoredBlob {
            data,
            etag: Self::etag(),
            last_modified: Utc::now(),
        };
        let receipt = UploadReceipt {
            etag: stored.etag.clone(),
            last_modified: Some(stored.last_modified),
            content_md5: None,
        };

        match self.blobs.entry(Self::blob_key(container, blob)) {
            dashmap::mapref::entry::Entry::Occupied(_) if !overwrite => {
                Err(StorageError::blob_already_exists(container, blob).with_status(409))
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                slot.insert(stored);
                Ok(Some(receipt))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(stored);
                Ok(Some(receipt))
            }
        }
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> StorageResult<()> {
        self.require_container(container)?;
        self.blobs
            .remove(&Self::blob_key(container, blob))
            .map(|_| ())
            .ok_or_else(|| StorageError::blob_not_found(container, blob).with_status(404))
    }

    async fn list_blobs(&self, container: &str) -> StorageResult<Vec<String>> {
        self.require_container(container)?;
        let mut names: Vec<String> = self
            .blobs
            .iter()
            .filter(|entry| entry.key().0.as_ref() == container)
            .map(|entry| entry.key().1.to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StorageResult<Bytes> {
        Ok(self.require_blob(container, blob)?.data)
    }

    async fn open_blob_stream(&self, container: &str, blob: &str) -> StorageResult<BlobStream> {
        let data = self.require_blob(container, blob)?.data;
        Ok(futures::stream::once(async move { Ok(data) }).boxed())
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    pop_receipt: Option<String>,
    text: String,
    dequeue_count: u32,
    insertion_time: DateTime<Utc>,
    visible_at: DateTime<Utc>,
}

/// In-memory queue store.
///
/// Successful deletions report status 200.
pub struct MemoryQueueStore {
    account: String,
    endpoint: String,
    queues: DashMap<Arc<str>, Mutex<VecDeque<StoredMessage>>>,
}

impl MemoryQueueStore {
    /// Creates a store for the development account.
    pub fn new() -> Self {
        Self::with_account(
            DEFAULT_ACCOUNT,
            format!("http://127.0.0.1:10001/{DEFAULT_ACCOUNT}"),
        )
    }

    pub fn with_account(account: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            endpoint: endpoint.into(),
            queues: DashMap::new(),
        }
    }

    /// Provisions a queue. Queues are never created by the gates.
    pub fn create_queue(&self, queue: &str) {
        self.queues
            .entry(Arc::from(queue))
            .or_insert_with(|| Mutex::new(VecDeque::new()));
    }

    /// Enqueues a message and returns its id.
    pub fn send_message(&self, queue: &str, text: impl Into<String>) -> StorageResult<String> {
        let entry = self
            .queues
            .get(queue)
            .ok_or_else(|| StorageError::queue_not_found(queue).with_status(404))?;
        let now = Utc::now();
        let message_id = uuid::Uuid::new_v4().to_string();
        entry.lock().push_back(StoredMessage {
            message_id: message_id.clone(),
            pop_receipt: None,
            text: text.into(),
            dequeue_count: 0,
            insertion_time: now,
            visible_at: now,
        });
        Ok(message_id)
    }

    /// Number of messages in the queue, visible or not.
    pub fn message_count(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.lock().len()).unwrap_or(0)
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteAccount for MemoryQueueStore {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn queue_exists(&self, queue: &str) -> StorageResult<bool> {
        Ok(self.queues.contains_key(queue))
    }

    async fn receive_messages(
        &self,
        queue: &str,
        max_messages: u8,
        visibility_timeout_secs: u32,
    ) -> StorageResult<Vec<QueueMessage>> {
        let entry = self
            .queues
            .get(queue)
            .ok_or_else(|| StorageError::queue_not_found(queue).with_status(404))?;

        let now = Utc::now();
        let next_visible = now + Duration::seconds(i64::from(visibility_timeout_secs));
        let mut messages = entry.lock();

        Ok(messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(usize::from(max_messages))
            .map(|m| {
                let pop_receipt = uuid::Uuid::new_v4().to_string();
                m.pop_receipt = Some(pop_receipt.clone());
                m.dequeue_count += 1;
                m.visible_at = next_visible;
                QueueMessage {
                    message_id: m.message_id.clone(),
                    pop_receipt,
                    message_text: m.text.clone(),
                    dequeue_count: m.dequeue_count,
                    insertion_time: Some(m.insertion_time),
                    time_next_visible: Some(next_visible),
                }
            })
            .collect())
    }

    async fn delete_message(
        &self,
        queue: &str,
        message_id: &str,
        pop_receipt: &str,
    ) -> StorageResult<u16> {
        let entry = self
            .queues
            .get(queue)
            .ok_or_else(|| StorageError::queue_not_found(queue).with_status(404))?;
        let mut messages = entry.lock();

        let position = messages.iter().position(|m| {
            m.message_id == message_id && m.pop_receipt.as_deref() == Some(pop_receipt)
        });

        match position {
            Some(index) => {
                messages.remove(index);
                Ok(200)
            }
            None => Err(StorageError::request_failed(format!(
                "Message {message_id} not found or pop receipt mismatch"
            ))
            .with_status(404)),
        }
    }
}

//! Queue service contract.

use async_trait::async_trait;

use super::RemoteAccount;
use crate::error::StorageResult;
use crate::models::QueueMessage;

/// Remote queue operations consumed by the queue gate.
#[async_trait]
pub trait QueueStore: RemoteAccount {
    async fn queue_exists(&self, queue: &str) -> StorageResult<bool>;

    /// Dequeues up to `max_messages`, hiding them for `visibility_timeout_secs`.
    async fn receive_messages(
        &self,
        queue: &str,
        max_messages: u8,
        visibility_timeout_secs: u32,
    ) -> StorageResult<Vec<QueueMessage>>;

    /// Deletes an in-flight message and returns the HTTP status of the
    /// deletion. Non-2xx outcomes are errors.
    async fn delete_message(
        &self,
        queue: &str,
        message_id: &str,
        pop_receipt: &str,
    ) -> StorageResult<u16>;
}

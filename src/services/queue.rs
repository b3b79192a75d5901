//! Queue existence gate and message acknowledgment.

use tracing::{debug, warn};

use super::require_name;
use crate::context::QueueConnection;
use crate::error::{StorageError, StorageResult};
use crate::models::QueueMessage;

/// Default visibility timeout applied to received messages.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u32 = 30;

/// Largest batch the queue service hands out per receive.
pub const MAX_MESSAGES_PER_RECEIVE: u8 = 32;

/// Guards queue access. Queues are expected to be provisioned up front and
/// are never created here.
#[derive(Debug, Clone)]
pub struct QueueGate {
    connection: QueueConnection,
    visibility_timeout_secs: u32,
}

impl QueueGate {
    pub fn new(connection: QueueConnection) -> Self {
        Self {
            connection,
            visibility_timeout_secs: DEFAULT_VISIBILITY_TIMEOUT_SECS,
        }
    }

    /// Sets how long received messages stay invisible to other consumers.
    pub fn with_visibility_timeout(mut self, secs: u32) -> Self {
        self.visibility_timeout_secs = secs;
        self
    }

    /// Fails with `QueueNotFound` if the queue does not exist.
    pub async fn ensure(&self, queue: &str) -> StorageResult<()> {
        require_name("queue", queue)?;
        if !self.connection.store().queue_exists(queue).await? {
            return Err(StorageError::queue_not_found(queue));
        }
        Ok(())
    }

    /// Dequeues up to `max_messages` messages.
    pub async fn receive(&self, queue: &str, max_messages: u8) -> StorageResult<Vec<QueueMessage>> {
        if max_messages == 0 || max_messages > MAX_MESSAGES_PER_RECEIVE {
            return Err(StorageError::invalid_argument(format!(
                "max_messages must be between 1 and {MAX_MESSAGES_PER_RECEIVE}, got {max_messages}"
            )));
        }
        self.ensure(queue).await?;

        let messages = self
            .connection
            .store()
            .receive_messages(queue, max_messages, self.visibility_timeout_secs)
            .await?;
        debug!("Received {} messages from {}", messages.len(), queue);
        Ok(messages)
    }

    /// Deletes a processed message.
    ///
    /// Only a 200 counts as confirmed; any other status leaves redelivery
    /// to the visibility timeout.
    pub async fn acknowledge(&self, queue: &str, message: &QueueMessage) -> StorageResult<bool> {
        require_name("queue", queue)?;
        let status = self
            .connection
            .store()
            .delete_message(queue, &message.message_id, &message.pop_receipt)
            .await?;

        if status != 200 {
            warn!(
                "Delete of message {} in {} returned {}, treating as unconfirmed",
                message.message_id, queue, status
            );
            return Ok(false);
        }
        debug!("Acknowledged message {} in {}", message.message_id, queue);
        Ok(true)
    }
}

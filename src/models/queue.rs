//! Queue message models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dequeued message. `message_id` plus `pop_receipt` identify the
/// in-flight delivery for acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    pub pop_receipt: String,
    pub message_text: String,
    pub dequeue_count: u32,
    pub insertion_time: Option<DateTime<Utc>>,
    pub time_next_visible: Option<DateTime<Utc>>,
}

impl QueueMessage {
    pub fn new(message_id: impl Into<String>, pop_receipt: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            pop_receipt: pop_receipt.into(),
            message_text: String::new(),
            dequeue_count: 0,
            insertion_time: None,
            time_next_visible: None,
        }
    }
}

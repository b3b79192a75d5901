//! Azure Queue Storage REST client.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::info;

use super::rest::{error_from_response, RestClient};
use super::{QueueStore, RemoteAccount};
use crate::config::StorageOptions;
use crate::error::StorageResult;
use crate::models::QueueMessage;
use crate::xml::parse_queue_messages;

/// Queue service client authenticated with the account's shared key.
pub struct AzureQueueClient {
    rest: RestClient,
}

impl AzureQueueClient {
    /// Creates a client for `https://{account}.queue.core.windows.net`, or
    /// the options' queue endpoint override.
    pub fn new(options: &StorageOptions) -> StorageResult<Self> {
        let rest = RestClient::new(options, "queue", options.queue_endpoint.as_deref())?;

        info!(
            "Queue client initialized: account={} endpoint={}",
            rest.account(),
            rest.endpoint()
        );

        Ok(Self { rest })
    }
}

impl RemoteAccount for AzureQueueClient {
    fn account_name(&self) -> &str {
        self.rest.account()
    }

    fn endpoint(&self) -> &str {
        self.rest.endpoint()
    }
}

#[async_trait]
impl QueueStore for AzureQueueClient {
    async fn queue_exists(&self, queue: &str) -> StorageResult<bool> {
        let req = self
            .rest
            .request(Method::GET, queue)
            .query(&[("comp", "metadata")]);
        let resp = self.rest.send(req).await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response("Get Queue Metadata", resp).await),
        }
    }

    async fn receive_messages(
        &self,
        queue: &str,
        max_messages: u8,
        visibility_timeout_secs: u32,
    ) -> StorageResult<Vec<QueueMessage>> {
        let req = self
            .rest
            .request(Method::GET, &format!("{queue}/messages"))
            .query(&[
                ("numofmessages", max_messages.to_string()),
                ("visibilitytimeout", visibility_timeout_secs.to_string()),
            ]);
        let resp = self.rest.send(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(error_from_response("Get Messages", resp).await);
        }
        let body = resp.text().await?;
        parse_queue_messages(&body)
    }

    async fn delete_message(
        &self,
        queue: &str,
        message_id: &str,
        pop_receipt: &str,
    ) -> StorageResult<u16> {
        let req = self
            .rest
            .request(Method::DELETE, &format!("{queue}/messages/{message_id}"))
            .query(&[("popreceipt", pop_receipt)]);
        let resp = self.rest.send(req).await?;
        if !resp.status().is_success() {
            return Err(error_from_response("Delete Message", resp).await);
        }
        Ok(resp.status().as_u16())
    }
}

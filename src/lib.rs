//! azstorage-rs: gated blob verbs and queue acknowledgment over an Azure
//! Storage account.
//!
//! The verb services check container and blob existence against the remote
//! store on every call, then upload, replace, delete, or read. Policy
//! violations are errors; attempted-but-failed writes return `false`.
//!
//! # Example
//!
//! ```no_run
//! use azstorage_rs::{BlobConnection, BlobServices, BlobStore, ConnectionConfig, StorageOptions};
//!
//! #[tokio::main]
//! async fn main() -> azstorage_rs::StorageResult<()> {
//!     let options = StorageOptions::from_connection_string(
//!         "AccountName=acct;AccountKey=a2V5",
//!     )?;
//!     let config = ConnectionConfig::<dyn BlobStore>::from_options(Some(&options))?;
//!     let services = BlobServices::new(BlobConnection::new(config));
//!
//!     let added = services.add.execute_bytes("images", "a.png", vec![0u8; 4], false).await?;
//!     assert!(added);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod server;
pub mod services;
pub mod storage;
pub mod xml;

// Re-exports for convenience
pub use config::{Args, Config, StorageOptions, StorageSource, DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY};
pub use context::{BlobConnection, ConnectionConfig, ConnectionContext, QueueConnection};
pub use error::{ErrorCode, StorageError, StorageResult};
pub use models::{BlobBody, ContainerHandle, Payload, QueueMessage, UploadReceipt};
pub use server::ApiServer;
pub use services::{
    AddBlobService, AsBytes, AsStream, AsUrl, BlobExistenceGate, BlobRepresentation, BlobServices,
    ContainerGate, DeleteBlobService, GetBlobService, QueueGate, UpdateBlobService,
};
pub use storage::{
    AzureBlobClient, AzureQueueClient, BlobStore, MemoryBlobStore, MemoryQueueStore, QueueStore,
    RemoteAccount,
};

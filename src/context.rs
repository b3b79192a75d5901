//! Connection context shared by the verb services.
//!
//! A [`ConnectionConfig`] is produced by one of two factory paths, a
//! pre-built client or an options record, and [`ConnectionContext::new`]
//! is the only constructor that consumes it.

use std::fmt;
use std::sync::Arc;

use crate::config::StorageOptions;
use crate::error::{StorageError, StorageResult};
use crate::storage::{AzureBlobClient, AzureQueueClient, BlobStore, QueueStore, RemoteAccount};

/// Resolved connection to a remote service.
pub struct ConnectionConfig<S: ?Sized> {
    store: Arc<S>,
    options: Option<StorageOptions>,
}

impl<S: ?Sized + RemoteAccount> ConnectionConfig<S> {
    /// Uses a pre-built client; the account name and endpoint are read from it.
    pub fn from_client(client: Option<Arc<S>>) -> StorageResult<Self> {
        let store = client.ok_or_else(|| {
            StorageError::configuration("A storage client must be supplied when no options are given")
        })?;

        if store.account_name().is_empty() {
            return Err(StorageError::configuration(
                "Cannot connect to a storage account with an empty account name",
            ));
        }

        Ok(Self {
            store,
            options: None,
        })
    }
}

fn validate_options(options: Option<&StorageOptions>) -> StorageResult<&StorageOptions> {
    let options = options.ok_or_else(|| {
        StorageError::configuration("Storage options must be supplied when no client is given")
    })?;

    if options.account_name.is_empty() {
        return Err(StorageError::configuration(
            "Cannot connect to a storage account with an empty account name",
        ));
    }
    if options.account_key.is_empty() {
        return Err(StorageError::configuration(
            "Cannot connect to a storage account with an empty account key",
        ));
    }

    Ok(options)
}

impl ConnectionConfig<dyn BlobStore> {
    /// Builds an [`AzureBlobClient`] from validated options.
    pub fn from_options(options: Option<&StorageOptions>) -> StorageResult<Self> {
        let options = validate_options(options)?;
        let store: Arc<dyn BlobStore> = Arc::new(AzureBlobClient::new(options)?);
        Ok(Self {
            store,
            options: Some(options.clone()),
        })
    }
}

impl ConnectionConfig<dyn QueueStore> {
    /// Builds an [`AzureQueueClient`] from validated options.
    pub fn from_options(options: Option<&StorageOptions>) -> StorageResult<Self> {
        let options = validate_options(options)?;
        let store: Arc<dyn QueueStore> = Arc::new(AzureQueueClient::new(options)?);
        Ok(Self {
            store,
            options: Some(options.clone()),
        })
    }
}

/// Account identity and client handle for one storage service.
pub struct ConnectionContext<S: ?Sized> {
    store: Arc<S>,
    account_name: String,
    account_url: String,
    connection_string: Option<String>,
}

/// Blob service connection used by the verb services.
pub type BlobConnection = ConnectionContext<dyn BlobStore>;

/// Queue service connection used by the queue gate.
pub type QueueConnection = ConnectionContext<dyn QueueStore>;

impl<S: ?Sized + RemoteAccount> ConnectionContext<S> {
    pub fn new(config: ConnectionConfig<S>) -> Self {
        let ConnectionConfig { store, options } = config;
        let connection_string = options.map(|o| {
            format!(
                "DefaultEndpointsProtocol=https;AccountName={};AccountKey={}",
                o.account_name, o.account_key
            )
        });

        Self {
            account_name: store.account_name().to_string(),
            account_url: store.endpoint().to_string(),
            store,
            connection_string,
        }
    }

    /// Shared client handle.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Account root URL, e.g. `https://{account}.blob.core.windows.net`.
    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    /// Connection string for options-derived contexts.
    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }
}

impl<S: ?Sized + BlobStore> ConnectionContext<S> {
    /// URL of a blob under this account.
    pub fn blob_url(&self, container: &str, blob: &str) -> String {
        self.store.blob_url(container, blob)
    }
}

impl<S: ?Sized> Clone for ConnectionContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            account_name: self.account_name.clone(),
            account_url: self.account_url.clone(),
            connection_string: self.connection_string.clone(),
        }
    }
}

impl<S: ?Sized> fmt::Debug for ConnectionContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("account_name", &self.account_name)
            .field("account_url", &self.account_url)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

//! Storage account options and demo server configuration.

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Default account name for development storage.
pub const DEFAULT_ACCOUNT: &str = "devstoreaccount1";

/// Default account key for development storage (base64 encoded).
pub const DEFAULT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Default port for the demo API server.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Storage REST API version sent with every request.
pub const DEFAULT_API_VERSION: &str = "2021-10-04";

/// Options record identifying a storage account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageOptions {
    pub account_name: String,
    pub account_key: String,
    /// Blob endpoint override, e.g. `http://127.0.0.1:10000/devstoreaccount1`.
    #[serde(default)]
    pub blob_endpoint: Option<String>,
    /// Queue endpoint override, e.g. `http://127.0.0.1:10001/devstoreaccount1`.
    #[serde(default)]
    pub queue_endpoint: Option<String>,
}

impl StorageOptions {
    pub fn new(account_name: impl Into<String>, account_key: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            account_key: account_key.into(),
            blob_endpoint: None,
            queue_endpoint: None,
        }
    }

    /// Options for the local development-storage account.
    pub fn development() -> Self {
        Self {
            account_name: DEFAULT_ACCOUNT.to_string(),
            account_key: DEFAULT_ACCOUNT_KEY.to_string(),
            blob_endpoint: Some(format!("http://127.0.0.1:10000/{DEFAULT_ACCOUNT}")),
            queue_endpoint: Some(format!("http://127.0.0.1:10001/{DEFAULT_ACCOUNT}")),
        }
    }

    /// Parses a `Key=Value;...` storage connection string.
    ///
    /// `AccountName` and `AccountKey` are required; `BlobEndpoint` and
    /// `QueueEndpoint` are honoured when present.
    pub fn from_connection_string(conn_str: &str) -> StorageResult<Self> {
        let mut options = StorageOptions::default();

        for part in conn_str.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // AccountKey values end in '=' padding, so split on the first '=' only.
            let Some((key, value)) = part.split_once('=') else {
                return Err(StorageError::configuration(format!(
                    "Malformed connection string segment: {part}"
                )));
            };
            match key {
                "AccountName" => options.account_name = value.to_string(),
                "AccountKey" => options.account_key = value.to_string(),
                "BlobEndpoint" => options.blob_endpoint = Some(value.to_string()),
                "QueueEndpoint" => options.queue_endpoint = Some(value.to_string()),
                _ => {}
            }
        }

        if options.account_name.is_empty() {
            return Err(StorageError::configuration(
                "Connection string does not contain an AccountName",
            ));
        }
        if options.account_key.is_empty() {
            return Err(StorageError::configuration(
                "Connection string does not contain an AccountKey",
            ));
        }

        Ok(options)
    }
}

/// Command-line arguments for the demo server.
#[derive(Parser, Debug, Clone)]
#[command(name = "azstorage-rs")]
#[command(about = "Demo HTTP surface over gated Azure Storage blob verbs")]
#[command(version)]
pub struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port for the API.
    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Storage account name.
    #[arg(long, env = "AZURE_STORAGE_ACCOUNT")]
    pub account_name: Option<String>,

    /// Storage account key (base64).
    #[arg(long, env = "AZURE_STORAGE_KEY", hide_env_values = true)]
    pub account_key: Option<String>,

    /// Full connection string; takes precedence over name/key.
    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Blob endpoint override (emulators).
    #[arg(long)]
    pub blob_endpoint: Option<String>,

    /// Serve from an in-process store instead of a remote account.
    #[arg(long)]
    pub in_memory: bool,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's')]
    pub silent: bool,
}

/// Where the demo server's blob store comes from.
#[derive(Debug, Clone)]
pub enum StorageSource {
    InMemory,
    /// Options record; `None` when nothing was configured.
    Account(Option<StorageOptions>),
    ConnectionString(String),
}

/// Server configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port for the API.
    pub port: u16,
    /// Enable debug logging.
    pub debug: bool,
    pub storage: StorageSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_API_PORT,
            debug: false,
            storage: StorageSource::InMemory,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let storage = if args.in_memory {
            StorageSource::InMemory
        } else if let Some(conn_str) = args.connection_string {
            StorageSource::ConnectionString(conn_str)
        } else if args.account_name.is_none() && args.account_key.is_none() {
            StorageSource::Account(None)
        } else {
            StorageSource::Account(Some(StorageOptions {
                account_name: args.account_name.unwrap_or_default(),
                account_key: args.account_key.unwrap_or_default(),
                blob_endpoint: args.blob_endpoint,
                queue_endpoint: None,
            }))
        };

        Self {
            host: args.host,
            port: args.port,
            debug: args.debug,
            storage,
        }
    }
}

impl Config {
    /// Returns the bind address for the API.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

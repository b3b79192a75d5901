//! HTTP server for the demo API.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, StorageSource};
use crate::context::{BlobConnection, ConnectionConfig};
use crate::error::StorageResult;
use crate::router::{create_router, AppState};
use crate::services::BlobServices;
use crate::storage::{BlobStore, MemoryBlobStore};

/// Demo API server over one blob connection.
pub struct ApiServer {
    config: Arc<Config>,
    connection: BlobConnection,
}

impl ApiServer {
    /// Creates a server whose connection is resolved from `config.storage`.
    pub fn new(config: Config) -> StorageResult<Self> {
        let connection = resolve_connection(&config.storage)?;
        Ok(Self::with_connection(config, connection))
    }

    /// Creates a server over an existing connection.
    pub fn with_connection(config: Config, connection: BlobConnection) -> Self {
        Self {
            config: Arc::new(config),
            connection,
        }
    }

    /// Runs the server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_address().parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already-bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let state = AppState {
            services: Arc::new(BlobServices::new(self.connection.clone())),
        };

        // Create router with middleware
        let app = create_router(state)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
                    .expose_headers(Any),
            )
            .layer(TraceLayer::new_for_http());

        info!("Blob API is listening on http://{}", listener.local_addr()?);
        info!(
            "Storage account: {} at {}",
            self.connection.account_name(),
            self.connection.account_url()
        );

        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        self.config.bind_address()
    }

    /// Returns the base URL for the API.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind_address())
    }
}

/// Resolves the configured storage source into a blob connection.
pub fn resolve_connection(source: &StorageSource) -> StorageResult<BlobConnection> {
    let config = match source {
        StorageSource::InMemory => {
            let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
            ConnectionConfig::from_client(Some(store))?
        }
        StorageSource::Account(options) => {
            ConnectionConfig::<dyn BlobStore>::from_options(options.as_ref())?
        }
        StorageSource::ConnectionString(conn_str) => {
            let options = crate::config::StorageOptions::from_connection_string(conn_str)?;
            ConnectionConfig::<dyn BlobStore>::from_options(Some(&options))?
        }
    };
    Ok(BlobConnection::new(config))
}

//! Container existence gate.

use tracing::{debug, info};

use super::require_name;
use crate::context::BlobConnection;
use crate::error::{StorageError, StorageResult};
use crate::models::ContainerHandle;

/// Enforces "must exist" or "must not exist" for a container.
#[derive(Debug, Clone)]
pub struct ContainerGate {
    connection: BlobConnection,
}

impl ContainerGate {
    pub fn new(connection: BlobConnection) -> Self {
        Self { connection }
    }

    /// Queries the store and enforces `expected_to_exist`.
    ///
    /// Returns whether the container exists. Only the combinations that do
    /// not violate the expectation return `Ok`: present when expected, or
    /// absent when not expected.
    pub async fn check(&self, name: &str, expected_to_exist: bool) -> StorageResult<bool> {
        require_name("container", name)?;

        let exists = self.connection.store().container_exists(name).await?;
        debug!(
            "Container check: name={} exists={} expected={}",
            name, exists, expected_to_exist
        );

        match (expected_to_exist, exists) {
            (true, false) => Err(StorageError::container_not_found(name)),
            (false, true) => Err(StorageError::container_already_exists(name)),
            _ => Ok(exists),
        }
    }

    /// Like [`check`](Self::check), creating the container when it is
    /// expected to be absent.
    pub async fn ensure(&self, name: &str, expected_to_exist: bool) -> StorageResult<ContainerHandle> {
        if self.check(name, expected_to_exist).await? {
            return Ok(ContainerHandle::existing(name));
        }

        self.connection.store().create_container(name).await?;
        info!("Created container: {}", name);
        Ok(ContainerHandle::created(name))
    }
}

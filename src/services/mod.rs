//! Gates and verb services.
//!
//! Every verb runs its existence checks against the remote store on each
//! call before doing any I/O. Policy violations are raised as errors;
//! a mutating call that was attempted and failed returns `Ok(false)`.

mod add;
mod blob_gate;
mod container_gate;
mod delete;
mod get;
mod queue;
mod update;

pub use add::*;
pub use blob_gate::*;
pub use container_gate::*;
pub use delete::*;
pub use get::*;
pub use queue::*;
pub use update::*;

use crate::context::BlobConnection;
use crate::error::{StorageError, StorageResult};

/// The four blob verbs over one connection.
#[derive(Debug, Clone)]
pub struct BlobServices {
    pub add: AddBlobService,
    pub update: UpdateBlobService,
    pub delete: DeleteBlobService,
    pub get: GetBlobService,
}

impl BlobServices {
    pub fn new(connection: BlobConnection) -> Self {
        Self {
            add: AddBlobService::new(connection.clone()),
            update: UpdateBlobService::new(connection.clone()),
            delete: DeleteBlobService::new(connection.clone()),
            get: GetBlobService::new(connection),
        }
    }
}

/// Rejects empty resource names.
pub(crate) fn require_name(kind: &str, name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::invalid_argument(format!(
            "Cannot use a {kind} with a name that is empty"
        )));
    }
    Ok(())
}

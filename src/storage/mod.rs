//! Remote storage collaborators.
//!
//! [`BlobStore`] and [`QueueStore`] describe the remote object store and
//! queue service the gates and verb services run against. The Azure
//! adapters speak the Storage REST API; the memory adapters keep the same
//! semantics in-process.

mod azure_blob;
mod azure_queue;
mod blob;
mod memory;
mod queue;
mod rest;

pub use azure_blob::*;
pub use azure_queue::*;
pub use blob::*;
pub use memory::*;
pub use queue::*;

pub(crate) use rest::{format_http_date, parse_http_date};

/// Identity of the account a remote client talks to.
pub trait RemoteAccount: Send + Sync {
    /// Storage account name.
    fn account_name(&self) -> &str;

    /// Service root URL without a trailing slash.
    fn endpoint(&self) -> &str;
}

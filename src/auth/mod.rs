//! Request signing for the Azure Storage REST API.

mod shared_key;

pub use shared_key::*;

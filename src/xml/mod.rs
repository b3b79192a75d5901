//! XML payloads exchanged with the Storage REST API.

pub mod deserialize;
pub mod serialize;

pub use deserialize::*;
pub use serialize::*;

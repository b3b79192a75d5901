//! Blob payloads, bodies, and upload acknowledgments.

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};

/// Unbounded byte source supplied by a caller.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Blob content returned by a streaming read.
pub type BlobStream = BoxStream<'static, StorageResult<Bytes>>;

/// Where the content of an add or update comes from.
pub enum Payload {
    /// Local file, read in full before upload.
    File(PathBuf),
    /// In-memory buffer.
    Bytes(Bytes),
    /// Lazy stream, consumed during upload.
    Stream(ByteStream),
}

impl Payload {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Payload::File(path.into())
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Payload::Bytes(data.into())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Payload::Stream(stream.boxed())
    }

    /// Resolves the payload into an uploadable body.
    ///
    /// A file that cannot be read is an argument error, not a transport failure.
    pub async fn into_body(self) -> StorageResult<BlobBody> {
        match self {
            Payload::File(path) => {
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    StorageError::invalid_argument(format!(
                        "Cannot read payload file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(BlobBody::Bytes(Bytes::from(data)))
            }
            Payload::Bytes(data) => Ok(BlobBody::Bytes(data)),
            Payload::Stream(stream) => Ok(BlobBody::Stream(stream)),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::File(path) => f.debug_tuple("File").field(path).finish(),
            Payload::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(data))
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Payload::Bytes(data)
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::File(path)
    }
}

/// Body handed to a blob store upload: bounded or unbounded.
pub enum BlobBody {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl BlobBody {
    /// Buffers the whole body. Stream read errors are transport failures.
    pub async fn collect(self) -> StorageResult<Bytes> {
        match self {
            BlobBody::Bytes(data) => Ok(data),
            BlobBody::Stream(stream) => {
                let buf = stream
                    .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                        buf.extend_from_slice(&chunk);
                        Ok(buf)
                    })
                    .await
                    .map_err(|e| StorageError::request_failed(format!("Payload stream failed: {e}")))?;
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for BlobBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobBody::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            BlobBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Acknowledgment returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Base64 MD5 of the content, when the store reports one.
    pub content_md5: Option<String>,
}

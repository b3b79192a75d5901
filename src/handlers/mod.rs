//! Request handlers for the demo API.

mod blobs;

pub use blobs::*;

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::error;

use crate::error::{StorageError, StorageResult};

/// Multipart fields shared by `POST` and `PUT /blobs`.
#[derive(Debug)]
pub struct BlobForm {
    pub container_name: String,
    pub blob_name: Option<String>,
    pub file: Bytes,
}

/// Reads `containerName`, optional `blobName`, and `file` from a multipart body.
pub async fn read_blob_form(mut multipart: Multipart) -> StorageResult<BlobForm> {
    let mut container_name = None;
    let mut blob_name = None;
    let mut file = None;

    let malformed = |e: axum::extract::multipart::MultipartError| {
        StorageError::invalid_argument(format!("Malformed multipart body: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("containerName") => container_name = Some(field.text().await.map_err(malformed)?),
            Some("blobName") => blob_name = Some(field.text().await.map_err(malformed)?),
            Some("file") => file = Some(field.bytes().await.map_err(malformed)?),
            _ => {}
        }
    }

    Ok(BlobForm {
        container_name: container_name
            .ok_or_else(|| StorageError::invalid_argument("Missing form field: containerName"))?,
        blob_name,
        file: file.ok_or_else(|| StorageError::invalid_argument("Missing form field: file"))?,
    })
}

/// Turns a verb result into a response: `Ok(true)` uses `success`,
/// `Ok(false)` is a bare 400, and errors are 400 with a JSON body.
pub fn verb_outcome<F>(verb: &str, result: StorageResult<bool>, success: F) -> Response
where
    F: FnOnce() -> Response,
{
    match result {
        Ok(true) => success(),
        Ok(false) => {
            error!("{} was attempted and failed", verb);
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(e) => {
            error!("{} rejected: {}", verb, e);
            e.into_response()
        }
    }
}

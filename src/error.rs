//! Storage account error types and error response formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced by the storage account services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    // Construction-time
    InvalidConfiguration,

    // Caller input
    InvalidArgument,

    // Pre-flight policy
    ContainerNotFound,
    ContainerAlreadyExists,
    BlobNotFound,
    BlobAlreadyExists,
    QueueNotFound,

    // Remote service
    RequestFailed,
    InvalidResponse,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfiguration => "InvalidConfiguration",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::ContainerNotFound => "ContainerNotFound",
            ErrorCode::ContainerAlreadyExists => "ContainerAlreadyExists",
            ErrorCode::BlobNotFound => "BlobNotFound",
            ErrorCode::BlobAlreadyExists => "BlobAlreadyExists",
            ErrorCode::QueueNotFound => "QueueNotFound",
            ErrorCode::RequestFailed => "RequestFailed",
            ErrorCode::InvalidResponse => "InvalidResponse",
        }
    }

    /// Maps an `x-ms-error-code` value returned by the remote service.
    ///
    /// Codes without a local counterpart become [`ErrorCode::RequestFailed`].
    pub fn from_remote(code: &str) -> Self {
        match code {
            "ContainerNotFound" => ErrorCode::ContainerNotFound,
            "ContainerAlreadyExists" => ErrorCode::ContainerAlreadyExists,
            "BlobNotFound" => ErrorCode::BlobNotFound,
            "BlobAlreadyExists" => ErrorCode::BlobAlreadyExists,
            "QueueNotFound" => ErrorCode::QueueNotFound,
            _ => ErrorCode::RequestFailed,
        }
    }

    /// Returns true for failures raised by a pre-flight gate.
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            ErrorCode::ContainerNotFound
                | ErrorCode::ContainerAlreadyExists
                | ErrorCode::BlobNotFound
                | ErrorCode::BlobAlreadyExists
                | ErrorCode::QueueNotFound
        )
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfiguration => "The storage account connection is not configured.",
            ErrorCode::InvalidArgument => "One of the request arguments is not valid.",
            ErrorCode::ContainerNotFound => "The specified container does not exist.",
            ErrorCode::ContainerAlreadyExists => "The specified container already exists.",
            ErrorCode::BlobNotFound => "The specified blob does not exist.",
            ErrorCode::BlobAlreadyExists => "The specified blob already exists.",
            ErrorCode::QueueNotFound => "The specified queue does not exist.",
            ErrorCode::RequestFailed => "The request to the storage service failed.",
            ErrorCode::InvalidResponse => "The storage service returned a malformed response.",
        }
    }
}

/// Storage error with code and message.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct StorageError {
    pub code: ErrorCode,
    pub message: String,
    /// HTTP status returned by the remote service, if any.
    pub status: Option<u16>,
    /// `x-ms-request-id` returned by the remote service, if any.
    pub request_id: Option<String>,
}

impl StorageError {
    /// Creates a new storage error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
            status: None,
            request_id: None,
        }
    }

    /// Creates a new storage error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            request_id: None,
        }
    }

    /// Sets the HTTP status for this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the request ID for this error.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidConfiguration, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidArgument, message)
    }

    pub fn container_not_found(container: &str) -> Self {
        Self::with_message(
            ErrorCode::ContainerNotFound,
            format!("There is no container with the name: {container}"),
        )
    }

    pub fn container_already_exists(container: &str) -> Self {
        Self::with_message(
            ErrorCode::ContainerAlreadyExists,
            format!("There is already a container on this storage account with the name: {container}"),
        )
    }

    pub fn blob_not_found(container: &str, blob: &str) -> Self {
        Self::with_message(
            ErrorCode::BlobNotFound,
            format!("There is no blob named {blob} in container {container}"),
        )
    }

    pub fn blob_already_exists(container: &str, blob: &str) -> Self {
        Self::with_message(
            ErrorCode::BlobAlreadyExists,
            format!("A blob named {blob} already exists in container {container}"),
        )
    }

    pub fn queue_not_found(queue: &str) -> Self {
        Self::with_message(
            ErrorCode::QueueNotFound,
            format!("There is no queue with the name: {queue}"),
        )
    }

    /// Transport-level failure of a remote call.
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::RequestFailed, message)
    }

    /// Returns true if the error came from the remote call itself rather
    /// than from configuration, input validation, or a gate.
    pub fn is_transport(&self) -> bool {
        matches!(self.code, ErrorCode::RequestFailed | ErrorCode::InvalidResponse)
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        let mut error = StorageError::request_failed(err.to_string());
        error.status = err.status().map(|s| s.as_u16());
        error
    }
}

impl From<quick_xml::Error> for StorageError {
    fn from(err: quick_xml::Error) -> Self {
        StorageError::with_message(ErrorCode::InvalidResponse, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for StorageError {
    /// The API surface reports every failure as 400; the code stays in the body.
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

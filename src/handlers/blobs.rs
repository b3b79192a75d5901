//! Blob verb handlers for the demo API.

use axum::{
    extract::{rejection::FormRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::error::StorageError;
use crate::router::AppState;
use crate::services::AsUrl;

use super::{read_blob_form, verb_outcome};

/// Form fields for `DELETE /blobs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBlobRequest {
    pub container_name: String,
    pub blob_name: String,
}

/// GET /blobs/{container} - Map of blob name to URL.
pub async fn list_blobs(State(state): State<AppState>, Path(container): Path<String>) -> Response {
    match state.services.get.get_all(&container, &AsUrl).await {
        Ok(blobs) => Json(blobs).into_response(),
        Err(e) => {
            error!("List of {} failed: {}", container, e);
            e.into_response()
        }
    }
}

/// POST /blobs - Add the uploaded file under a fresh blob name.
pub async fn add_blob(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_blob_form(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let blob_name = Uuid::new_v4().to_string();

    let result = state
        .services
        .add
        .execute_bytes(&form.container_name, &blob_name, form.file, true)
        .await;

    verb_outcome("Add", result, move || Json(blob_name).into_response())
}

/// PUT /blobs - Replace an existing blob with the uploaded file.
pub async fn update_blob(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_blob_form(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let Some(blob_name) = form.blob_name else {
        return StorageError::invalid_argument("Missing form field: blobName").into_response();
    };

    let result = state
        .services
        .update
        .execute_bytes(&form.container_name, &blob_name, form.file, true)
        .await;

    verb_outcome("Update", result, || StatusCode::OK.into_response())
}

/// DELETE /blobs - Delete a blob; 202 on success.
pub async fn delete_blob(
    State(state): State<AppState>,
    form: Result<Form<DeleteBlobRequest>, FormRejection>,
) -> Response {
    let Form(request) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return StorageError::invalid_argument(rejection.body_text()).into_response()
        }
    };

    let result = state
        .services
        .delete
        .execute(&request.container_name, &request.blob_name)
        .await;

    verb_outcome("Delete", result, || StatusCode::ACCEPTED.into_response())
}

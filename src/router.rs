//! Request routing for the demo API.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::services::BlobServices;

/// Application state shared between handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<BlobServices>,
}

/// Creates the router for the blob verbs.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/blobs",
            post(handlers::add_blob)
                .put(handlers::update_blob)
                .delete(handlers::delete_blob),
        )
        .route("/blobs/:container", get(handlers::list_blobs))
        .with_state(state)
}

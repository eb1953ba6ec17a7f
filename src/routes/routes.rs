//! Defines routes for the gallery.
//!
//! ## Structure
//! - `GET  /`                 : all images for a signed-in viewer, landing page otherwise
//! - `POST /`                 : multipart upload (field `file`), redirects to `/`
//! - `GET  /me`               : the viewer's own images
//! - `GET  /images/{filename}`: download a stored image
//! - `GET  /healthz`, `GET /readyz`: probes

use crate::{
    handlers::{
        gallery_handlers::{index, my_gallery, serve_image, upload_image},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};

/// Build the router. Request bodies are capped at `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(index).post(upload_image))
        .route("/me", get(my_gallery))
        .route("/images/{filename}", get(serve_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

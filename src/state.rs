use crate::services::gallery_service::GalleryService;
use axum::http::HeaderName;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gallery: GalleryService,
    /// Header the identity proxy uses to pass the authenticated username.
    pub auth_header: HeaderName,
}

impl AppState {
    pub fn new(gallery: GalleryService, auth_header: HeaderName) -> Self {
        Self {
            gallery,
            auth_header,
        }
    }
}

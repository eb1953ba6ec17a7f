//! Validation and naming rules applied to incoming uploads.

use crate::services::gallery_service::{GalleryError, GalleryResult};
use uuid::Uuid;

/// Whether a declared content type denotes an image.
pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// Build a fresh identifier `<uuid>.<ext>` keeping the original extension
/// verbatim, case included.
///
/// Only the last path component of `original` is considered, and the
/// extension must be non-empty ASCII alphanumerics so the identifier can be
/// used as a URL segment as is.
pub fn generate_identifier(original: &str) -> GalleryResult<String> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let ext = match base.rfind('.') {
        Some(pos) => &base[pos + 1..],
        None => return Err(GalleryError::InvalidFilename(original.to_string())),
    };
    if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(GalleryError::InvalidFilename(original.to_string()));
    }

    Ok(format!("{}.{}", Uuid::new_v4(), ext))
}

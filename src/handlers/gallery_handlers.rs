//! HTTP handlers for gallery pages, uploads and image downloads.
//! Image bodies are streamed in both directions; storage and metadata
//! concerns live in `GalleryService`.

use crate::{
    errors::AppError,
    extractors::viewer::{Principal, Viewer},
    services::gallery_service::{GalleryError, IncomingImage},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use futures::TryStreamExt;
use serde::Serialize;
use std::io;
use tokio_util::io::ReaderStream;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// Page model returned in place of a rendered template.
#[derive(Debug, Serialize)]
pub struct GalleryPage {
    pub authenticated: bool,
    pub username: Option<String>,
    pub images: Vec<String>,
}

/// `GET /`: every stored image for a signed-in viewer, landing page otherwise.
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Json<GalleryPage>, AppError> {
    let Some(username) = viewer.username() else {
        return Ok(Json(GalleryPage {
            authenticated: false,
            username: None,
            images: Vec::new(),
        }));
    };

    let user = state.gallery.resolve_user(username).await?;
    let images = state.gallery.images_for(None).await?;

    Ok(Json(GalleryPage {
        authenticated: true,
        username: Some(user.username),
        images,
    }))
}

/// `GET /me`: only the viewer's own uploads.
pub async fn my_gallery(
    State(state): State<AppState>,
    Principal(username): Principal,
) -> Result<Json<GalleryPage>, AppError> {
    let images = state.gallery.images_for(Some(&username)).await?;

    Ok(Json(GalleryPage {
        authenticated: true,
        username: Some(username),
        images,
    }))
}

/// `POST /`: store the `file` field and redirect back to the gallery.
pub async fn upload_image(
    State(state): State<AppState>,
    Principal(username): Principal,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| {
            tracing::debug!("unreadable multipart body: {}", e);
            AppError::new(e.status(), "upload rejected")
        })?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let upload = IncomingImage {
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            body: field.map_err(io::Error::other),
        };
        state.gallery.upload(&username, upload).await?;
        return Ok(Redirect::to("/"));
    }

    Err(GalleryError::MissingField(FILE_FIELD).into())
}

/// `GET /images/{filename}`: stream the blob as an attachment.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let handle = state.gallery.open_image(&filename).await?;
    let content_type = mime_guess::from_path(&handle.identifier).first_or_octet_stream();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type.essence_str())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(handle.len));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", handle.identifier))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    let body = Body::from_stream(ReaderStream::new(handle.file));
    Ok((StatusCode::OK, headers, body).into_response())
}

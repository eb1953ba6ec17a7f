//! GalleryService: composes the blob store with the metadata repositories.
//!
//! It owns the upload workflow (validate → name → store → resolve owner →
//! record) and turns stored blobs into retrieval URLs for a viewer.

use crate::{
    models::{image::Image, user::User},
    services::{
        blob_store::{BlobHandle, BlobStore, BlobStoreError},
        image_repository::ImageRepository,
        upload::{generate_identifier, is_image},
        user_repository::UserRepository,
    },
};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use sqlx::SqlitePool;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("content type `{0}` is not an image")]
    NotAnImage(String),
    #[error("filename `{0}` has no usable extension")]
    InvalidFilename(String),
    #[error("multipart field `{0}` is missing")]
    MissingField(&'static str),
    #[error(transparent)]
    Storage(#[from] BlobStoreError),
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("metadata repository error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl GalleryError {
    /// True for problems with the request itself rather than the service.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotAnImage(_) | Self::InvalidFilename(_) | Self::MissingField(_)
        )
    }
}

pub type GalleryResult<T> = Result<T, GalleryError>;

/// A file as received from the client, body not yet consumed.
pub struct IncomingImage<S> {
    /// Filename declared by the client.
    pub file_name: Option<String>,
    /// Declared content type.
    pub content_type: Option<String>,
    pub body: S,
}

#[derive(Clone)]
pub struct GalleryService {
    /// Shared SQLite pool, also used by readiness checks.
    pub db: Arc<SqlitePool>,
    pub blobs: BlobStore,
    pub images: ImageRepository,
    pub users: UserRepository,
    public_url: String,
}

impl GalleryService {
    pub fn new(
        db: Arc<SqlitePool>,
        storage_dir: impl Into<PathBuf>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            images: ImageRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            blobs: BlobStore::new(storage_dir),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            db,
        }
    }

    /// Retrieval URL for a blob identifier.
    pub fn image_url(&self, identifier: &str) -> String {
        format!("{}/images/{}", self.public_url, identifier)
    }

    pub async fn resolve_user(&self, username: &str) -> GalleryResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| GalleryError::UserNotFound(username.to_string()))
    }

    /// URLs visible to `viewer`.
    ///
    /// Without a viewer every stored blob is listed straight from the blob
    /// store; with one, only the images recorded as owned by that user.
    pub async fn images_for(&self, viewer: Option<&str>) -> GalleryResult<Vec<String>> {
        let Some(username) = viewer else {
            let identifiers: Vec<String> = self.blobs.load_all().try_collect().await?;
            return Ok(identifiers
                .iter()
                .map(|identifier| self.image_url(identifier))
                .collect());
        };

        let user = self.resolve_user(username).await?;
        let records = self.images.find_by_owner(&user.username).await?;
        debug!("{} owns {} images", user.username, records.len());

        Ok(records
            .iter()
            .filter_map(|record| match record.identifier() {
                Some(identifier) => Some(self.image_url(identifier)),
                None => {
                    warn!("image {} has unusable path {}", record.id, record.path);
                    None
                }
            })
            .collect())
    }

    /// Run the upload workflow for `principal`.
    ///
    /// Nothing is written unless the content type is an image. If the
    /// metadata insert fails after the blob was written, the blob stays on
    /// disk without a record.
    pub async fn upload<S>(
        &self,
        principal: &str,
        upload: IncomingImage<S>,
    ) -> GalleryResult<Image>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let content_type = upload.content_type.unwrap_or_default();
        if !is_image(&content_type) {
            return Err(GalleryError::NotAnImage(content_type));
        }

        let original = upload
            .file_name
            .ok_or(GalleryError::MissingField("filename"))?;
        let identifier = generate_identifier(&original)?;

        let size = self.blobs.store(&identifier, upload.body).await?;
        let path = self.blobs.get_path(&identifier)?;

        let owner = self.resolve_user(principal).await?;
        let record = match self
            .images
            .create(&path.to_string_lossy(), &owner.username)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    "metadata insert failed, blob {} left without a record: {}",
                    path.display(),
                    err
                );
                return Err(GalleryError::Persistence(err));
            }
        };

        info!(
            "{} uploaded {} as {} ({} bytes)",
            owner.username, original, identifier, size
        );
        Ok(record)
    }

    /// Open the blob behind a retrieval URL's filename segment.
    pub async fn open_image(&self, identifier: &str) -> GalleryResult<BlobHandle> {
        Ok(self.blobs.load_as_resource(identifier).await?)
    }
}

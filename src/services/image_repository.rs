//! SQLite-backed persistence for image metadata records.

use crate::models::image::Image;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

const IMAGE_COLUMNS: &str = "id, path, owner, created_at";

#[derive(Clone)]
pub struct ImageRepository {
    db: Arc<SqlitePool>,
}

impl ImageRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a record for the blob at `path`, owned by `owner`.
    ///
    /// Fails on a duplicate `path` or an unknown owner (foreign key).
    pub async fn create(&self, path: &str, owner: &str) -> Result<Image, sqlx::Error> {
        sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO images (path, owner, created_at) VALUES (?, ?, ?)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(path)
        .bind(owner)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
    }

    pub async fn find_all(&self) -> Result<Vec<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images ORDER BY id ASC"
        ))
        .fetch_all(&*self.db)
        .await
    }

    pub async fn find_by_owner(&self, owner: &str) -> Result<Vec<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE owner = ? ORDER BY id ASC"
        ))
        .bind(owner)
        .fetch_all(&*self.db)
        .await
    }
}

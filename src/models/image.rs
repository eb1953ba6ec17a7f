//! Metadata record linking a stored blob to the user who uploaded it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::Path;

/// A persisted image record.
///
/// The record stores where the blob lives on disk and who owns it; the
/// bytes themselves stay in the blob store. Records are never updated
/// once created.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Image {
    /// Surrogate key assigned by the database.
    pub id: i64,

    /// Canonical on-disk path of the blob (unique).
    pub path: String,

    /// Username of the uploading user.
    pub owner: String,

    /// When the record was committed.
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Blob identifier, i.e. the final component of `path`.
    pub fn identifier(&self) -> Option<&str> {
        Path::new(&self.path).file_name().and_then(|name| name.to_str())
    }
}

//! Users known to the gallery. Identities are issued elsewhere; this table
//! only mirrors the usernames that may own images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct User {
    /// Unique login name supplied by the identity provider.
    pub username: String,

    pub created_at: DateTime<Utc>,
}

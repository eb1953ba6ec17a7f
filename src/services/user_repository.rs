//! Lookup of gallery users by username.

use crate::models::user::User;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct UserRepository {
    db: Arc<SqlitePool>,
}

impl UserRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT username, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&*self.db)
            .await
    }

    /// Register `username`. Registering an existing name is a unique violation.
    pub async fn create(&self, username: &str) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, created_at) VALUES (?, ?)
             RETURNING username, created_at",
        )
        .bind(username)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
    }
}

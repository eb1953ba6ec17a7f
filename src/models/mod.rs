//! Core data models for the image gallery.
//!
//! They map to database tables via `sqlx::FromRow` and serialize as JSON via
//! `serde`.

pub mod image;
pub mod user;

//! Image gallery service: authenticated users upload images that are kept
//! on disk, with ownership recorded in SQLite.

pub mod config;
pub mod db;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

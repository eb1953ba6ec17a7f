pub mod blob_store;
pub mod gallery_service;
pub mod image_repository;
pub mod upload;
pub mod user_repository;

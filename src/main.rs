use anyhow::{Context, Result};
use axum::{Router, http::HeaderName};
use image_gallery::{
    config::{AdminTask, AppConfig},
    db, routes,
    services::{gallery_service::GalleryService, user_repository::UserRepository},
    state::AppState,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + admin task ---
    let (cfg, task) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting image-gallery with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle one-shot admin modes ---
    match task {
        AdminTask::Migrate => {
            db::run_migrations(&db).await?;
            tracing::info!("Database migration complete.");
            return Ok(());
        }
        AdminTask::AddUser(username) => {
            db::run_migrations(&db).await?;
            let username = username.trim();
            if username.is_empty() {
                anyhow::bail!("username must not be empty");
            }
            let user = UserRepository::new(db.clone())
                .create(username)
                .await
                .with_context(|| format!("registering user `{}`", username))?;
            tracing::info!("Registered user {}", user.username);
            return Ok(());
        }
        AdminTask::Serve => db::run_migrations(&db).await?,
    }

    // --- Initialize core service ---
    let auth_header = HeaderName::try_from(cfg.auth_header.as_str())
        .with_context(|| format!("invalid auth header name `{}`", cfg.auth_header))?;
    let gallery = GalleryService::new(db.clone(), cfg.storage_dir.clone(), cfg.public_url.clone());

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes)
        .with_state(AppState::new(gallery, auth_header));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

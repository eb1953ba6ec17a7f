//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> metadata database and blob directory both usable

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

const PROBE_BYTES: &[u8] = b"readyz";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl From<Result<(), String>> for CheckStatus {
    fn from(result: Result<(), String>) -> Self {
        Self {
            ok: result.is_ok(),
            error: result.err(),
        }
    }
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz`
///
/// 200 when every check passes, 503 otherwise; the body reports each check.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let gallery = &state.gallery;

    let mut checks = BTreeMap::new();
    checks.insert("sqlite", CheckStatus::from(probe_sqlite(&gallery.db).await));
    checks.insert("disk", CheckStatus::from(probe_disk(&gallery.blobs.root).await));

    let ready = checks.values().all(|check| check.ok);
    if !ready {
        tracing::warn!("readiness check failed");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        checks,
    };
    (status, Json(body))
}

async fn probe_sqlite(db: &SqlitePool) -> Result<(), String> {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(db).await {
        Ok(1) => Ok(()),
        Ok(v) => Err(format!("unexpected result: {}", v)),
        Err(e) => Err(format!("error: {}", e)),
    }
}

/// Write, read back and remove a hidden file in the blob root. Hidden names
/// never show up in gallery listings.
async fn probe_disk(root: &Path) -> Result<(), String> {
    let probe = root.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&probe, PROBE_BYTES)
        .await
        .map_err(|e| format!("could not write probe file: {}", e))?;

    let read = fs::read(&probe).await;
    let removed = fs::remove_file(&probe).await;

    match read {
        Ok(bytes) if bytes == PROBE_BYTES => {}
        Ok(_) => return Err("probe file content mismatch".into()),
        Err(e) => return Err(format!("could not read probe file: {}", e)),
    }
    removed.map_err(|e| format!("could not remove probe file: {}", e))
}

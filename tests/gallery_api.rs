//! Gallery HTTP API tests.
//!
//! Drive the full router against an in-memory database and a temporary
//! storage directory.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderName, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use image_gallery::{
    db, routes::routes::routes, services::gallery_service::GalleryService, state::AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const AUTH_HEADER: &str = "x-authenticated-user";
const BOUNDARY: &str = "gallery-test-boundary";

struct TestApp {
    router: Router,
    gallery: GalleryService,
    storage: TempDir,
}

async fn create_test_app(users: &[&str]) -> TestApp {
    create_test_app_with_limit(users, 1024 * 1024).await
}

async fn create_test_app_with_limit(users: &[&str], max_upload_bytes: usize) -> TestApp {
    let storage = tempfile::tempdir().expect("Failed to create storage dir");
    let pool = Arc::new(
        db::connect_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    db::run_migrations(&pool).await.expect("Failed to migrate");

    let gallery = GalleryService::new(pool, storage.path(), "");
    for user in users {
        gallery.users.create(user).await.expect("Failed to add user");
    }

    let state = AppState::new(gallery.clone(), HeaderName::from_static(AUTH_HEADER));
    let router = routes(max_upload_bytes).with_state(state);

    TestApp {
        router,
        gallery,
        storage,
    }
}

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(
    user: Option<&str>,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut builder = Request::post("/").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(user) = user {
        builder = builder.header(AUTH_HEADER, user);
    }
    builder
        .body(Body::from(multipart_body("file", filename, content_type, data)))
        .unwrap()
}

fn get_request(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user) = user {
        builder = builder.header(AUTH_HEADER, user);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn page(app: &TestApp, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, get_request(uri, user)).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn image_urls(page: &Value) -> Vec<String> {
    page["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn stored_file_count(app: &TestApp) -> usize {
    std::fs::read_dir(app.storage.path()).unwrap().count()
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_redirects_and_lists_for_owner() {
    let app = create_test_app(&["alice"]).await;

    let (status, headers, _) =
        send(&app, upload_request(Some("alice"), "cat.png", "image/png", b"png-bytes")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/");

    let (status, body) = page(&app, "/me", Some("alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    let urls = image_urls(&body);
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("/images/"));
    assert!(urls[0].ends_with(".png"));

    let (status, headers, bytes) = send(&app, get_request(&urls[0], None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"png-bytes");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    let filename = urls[0].trim_start_matches("/images/");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{filename}\"").as_str()
    );
}

#[tokio::test]
async fn test_each_upload_adds_exactly_one_entry() {
    let app = create_test_app(&["alice"]).await;

    for n in 0..3 {
        let (_, before) = page(&app, "/me", Some("alice")).await;
        let data = format!("image-{n}");
        send(&app, upload_request(Some("alice"), "pic.jpg", "image/jpeg", data.as_bytes())).await;
        let (_, after) = page(&app, "/me", Some("alice")).await;
        assert_eq!(image_urls(&after).len(), image_urls(&before).len() + 1);
    }

    let urls = image_urls(&page(&app, "/me", Some("alice")).await.1);
    let mut unique = urls.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn test_upload_preserves_extension_case() {
    let app = create_test_app(&["alice"]).await;

    send(&app, upload_request(Some("alice"), "photo.PNG", "image/png", b"x")).await;
    let records = app.gallery.images.find_by_owner("alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].identifier().unwrap().ends_with(".PNG"));
}

#[tokio::test]
async fn test_non_image_upload_is_rejected_without_side_effects() {
    let app = create_test_app(&["alice"]).await;

    let (status, _, body) =
        send(&app, upload_request(Some("alice"), "notes.txt", "text/plain", b"hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());

    assert_eq!(stored_file_count(&app), 0);
    assert!(app.gallery.images.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_without_extension_is_rejected() {
    let app = create_test_app(&["alice"]).await;

    let (status, _, _) =
        send(&app, upload_request(Some("alice"), "photo", "image/png", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stored_file_count(&app), 0);
}

#[tokio::test]
async fn test_upload_requires_authentication() {
    let app = create_test_app(&["alice"]).await;

    let (status, _, _) = send(&app, upload_request(None, "cat.png", "image/png", b"x")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(stored_file_count(&app), 0);
}

#[tokio::test]
async fn test_upload_missing_file_field() {
    let app = create_test_app(&["alice"]).await;

    let request = Request::post("/")
        .header(AUTH_HEADER, "alice")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body("other", "cat.png", "image/png", b"x")))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_by_unregistered_user_fails_generically() {
    let app = create_test_app(&[]).await;

    let (status, _, body) =
        send(&app, upload_request(Some("mallory"), "cat.png", "image/png", b"x")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(!body["error"].as_str().unwrap().contains("mallory"));
    assert!(app.gallery.images.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_metadata_insert_is_generic_error() {
    let app = create_test_app(&["alice"]).await;
    sqlx::query("DROP TABLE images")
        .execute(&*app.gallery.db)
        .await
        .unwrap();

    let (status, _, body) =
        send(&app, upload_request(Some("alice"), "cat.png", "image/png", b"x")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(!body["error"].as_str().unwrap().contains("images"));
    // blob written before the insert stays behind
    assert_eq!(stored_file_count(&app), 1);
}

#[tokio::test]
async fn test_oversize_upload_hides_multipart_error_text() {
    let app = create_test_app_with_limit(&["alice"], 64).await;

    let (status, _, body) = send(
        &app,
        upload_request(Some("alice"), "big.png", "image/png", &[0u8; 4096]),
    )
    .await;
    assert!(status.is_client_error());
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "upload rejected");
    assert_eq!(stored_file_count(&app), 0);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_index_anonymous_is_landing_page() {
    let app = create_test_app(&["alice"]).await;
    send(&app, upload_request(Some("alice"), "cat.png", "image/png", b"x")).await;

    let (status, body) = page(&app, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
    assert!(body["username"].is_null());
    assert!(image_urls(&body).is_empty());
}

#[tokio::test]
async fn test_index_authenticated_lists_every_image() {
    let app = create_test_app(&["alice", "bob"]).await;
    send(&app, upload_request(Some("alice"), "a.png", "image/png", b"a")).await;
    send(&app, upload_request(Some("bob"), "b.gif", "image/gif", b"b")).await;

    let (status, body) = page(&app, "/", Some("bob")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], "bob");
    assert_eq!(image_urls(&body).len(), 2);
}

#[tokio::test]
async fn test_index_unknown_user_is_error() {
    let app = create_test_app(&[]).await;

    let (status, body) = page(&app, "/", Some("ghost")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_my_gallery_excludes_other_owners() {
    let app = create_test_app(&["alice", "bob"]).await;
    send(&app, upload_request(Some("alice"), "a.png", "image/png", b"a")).await;
    send(&app, upload_request(Some("bob"), "b.png", "image/png", b"b")).await;

    let alice_records = app.gallery.images.find_by_owner("alice").await.unwrap();
    let bob_records = app.gallery.images.find_by_owner("bob").await.unwrap();
    let bob_url = app.gallery.image_url(bob_records[0].identifier().unwrap());

    let urls = image_urls(&page(&app, "/me", Some("alice")).await.1);
    assert_eq!(
        urls,
        vec![app.gallery.image_url(alice_records[0].identifier().unwrap())]
    );
    assert!(!urls.contains(&bob_url));
}

#[tokio::test]
async fn test_my_gallery_requires_authentication() {
    let app = create_test_app(&["alice"]).await;

    let (status, _) = page(&app, "/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = page(&app, "/me", Some("anonymousUser")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Serving
// ============================================================================

#[tokio::test]
async fn test_serve_unknown_image_is_not_found() {
    let app = create_test_app(&[]).await;

    let (status, _, _) = send(&app, get_request("/images/missing.png", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serve_rejects_traversal() {
    let app = create_test_app(&[]).await;
    let (status, _, _) = send(&app, get_request("/images/..%2Fgallery-secret.txt", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, get_request("/images/..", None)).await;
    assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND);
}

// ============================================================================
// Probes
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let app = create_test_app(&[]).await;

    let (status, body) = page(&app, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = page(&app, "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
    assert_eq!(body["checks"]["disk"]["ok"], true);
    assert_eq!(stored_file_count(&app), 0);
}

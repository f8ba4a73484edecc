//! Test helpers: build AppState and router for integration tests.
//!
//! The app runs over `LocalStorage` in a temp dir and the in-memory catalog,
//! so no external services are needed.
//! Run with: `cargo test -p depot-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::{TestResponse, TestServer};
use depot_api::constants;
use depot_api::setup::routes;
use depot_api::state::AppState;
use depot_core::{Config, StorageBackend};
use depot_db::MemoryCatalog;
use depot_services::create_access_policy;
use depot_storage::{LocalStorage, Storage, UrlSigner};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Base URL the local backend writes into signed URLs.
pub const TEST_BASE_URL: &str = "http://localhost:4000";
pub const TEST_SIGNING_SECRET: &str = "test-signing-secret-at-least-32-characters";
/// Token that may write to group `g1` and repository `repo1` only.
pub const WRITER_TOKEN: &str = "writer-token";
/// Token with write access to every group.
pub const ADMIN_TOKEN: &str = "admin-token";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Test application: server plus owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub catalog: Arc<MemoryCatalog>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn signer(&self) -> UrlSigner {
        UrlSigner::new(TEST_SIGNING_SECRET)
    }
}

pub fn create_test_config(storage_path: &str) -> Config {
    let mut api_tokens = HashMap::new();
    api_tokens.insert(
        WRITER_TOKEN.to_string(),
        vec!["g1".to_string(), "repo1".to_string()],
    );
    api_tokens.insert(ADMIN_TOKEN.to_string(), vec!["*".to_string()]);

    Config {
        storage_backend: StorageBackend::Local,
        local_storage_path: storage_path.to_string(),
        local_storage_base_url: TEST_BASE_URL.to_string(),
        url_signing_secret: TEST_SIGNING_SECRET.to_string(),
        api_tokens,
        ..Config::default()
    }
}

/// Setup test app with local storage and an in-memory catalog.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Like [`setup_test_app`], letting the test adjust the config first.
pub async fn setup_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut config = create_test_config(&temp_dir.path().to_string_lossy());
    adjust(&mut config);

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            temp_dir.path().to_path_buf(),
            config.local_storage_base_url.clone(),
            UrlSigner::new(config.url_signing_secret.as_bytes()),
        )
        .await
        .expect("Failed to create local storage"),
    );
    let catalog = Arc::new(MemoryCatalog::new());
    let access = create_access_policy(&config);

    let state = Arc::new(AppState::new(
        config.clone(),
        storage,
        catalog.clone(),
        access,
    ));
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        catalog,
        _temp_dir: temp_dir,
    }
}

/// Split a signed URL into its path and query pairs.
pub fn split_signed_url(url: &str) -> (String, Vec<(String, String)>) {
    let without_base = url
        .strip_prefix(TEST_BASE_URL)
        .expect("signed URL uses the test base URL");
    let (path, query) = without_base.split_once('?').unwrap_or((without_base, ""));
    let params = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    (path.to_string(), params)
}

/// PUT bytes to a signed upload URL, as a client would against object storage.
pub async fn put_signed(
    client: &TestServer,
    url: &str,
    content_type: &str,
    data: Vec<u8>,
) -> TestResponse {
    let (path, params) = split_signed_url(url);
    let mut request = client
        .put(&path)
        .content_type(content_type)
        .bytes(data.into());
    for (key, value) in params {
        request = request.add_query_param(&key, value);
    }
    request.await
}

/// GET a signed download URL.
pub async fn get_signed(client: &TestServer, url: &str) -> TestResponse {
    let (path, params) = split_signed_url(url);
    let mut request = client.get(&path);
    for (key, value) in params {
        request = request.add_query_param(&key, value);
    }
    request.await
}

pub async fn request_upload_url(
    client: &TestServer,
    token: &str,
    group_id: &str,
    file_name: &str,
    file_type: &str,
    file_size: usize,
) -> TestResponse {
    client
        .post(&api_path("/uploads/presigned"))
        .add_header("Authorization", bearer(token))
        .json(&json!({
            "groupId": group_id,
            "fileName": file_name,
            "fileType": file_type,
            "fileSize": file_size,
        }))
        .await
}

/// Issue, upload and finalize one file. Returns the finalized record JSON.
pub async fn upload_file(
    client: &TestServer,
    token: &str,
    group_id: &str,
    file_name: &str,
    file_type: &str,
    data: Vec<u8>,
) -> Value {
    let size = data.len();
    let issued = request_upload_url(client, token, group_id, file_name, file_type, size).await;
    issued.assert_status_ok();
    let issued: Value = issued.json();

    let upload_url = issued["uploadUrl"].as_str().expect("uploadUrl");
    let object_key = issued["objectKey"].as_str().expect("objectKey").to_string();
    put_signed(client, upload_url, file_type, data)
        .await
        .assert_status_ok();

    let finalized = client
        .post(&api_path("/uploads/finalize"))
        .add_header("Authorization", bearer(token))
        .json(&json!({
            "groupId": group_id,
            "name": file_name,
            "objectKey": object_key,
            "fileSize": size,
            "mimeType": file_type,
        }))
        .await;
    finalized.assert_status_ok();
    finalized.json()
}

//! Shared helpers for integration tests: a wiremock-backed LIMS API.

#![allow(dead_code)]

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use qbench_sync_core::{
    Config, Credential, RequestExecutor, RetryPolicy, SkipPolicy, TokenManager,
    build_http_client,
};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub use socket_guard::start_mock_server_or_skip;

pub const USERNAME: &str = "sync-bot";
pub const SECRET: &str = "integration-secret";
pub const API_PREFIX: &str = "/api/v1";

/// Issues `tok-1`, `tok-2`, ... and counts exchanges.
pub struct TokenResponder {
    issued: Arc<AtomicUsize>,
}

impl Respond for TokenResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": format!("tok-{n}"),
            "token_type": "bearer",
            "expires_in": 300
        }))
    }
}

/// Mounts the token endpoint; the returned counter is the number of exchanges.
pub async fn mount_token_endpoint(server: &MockServer) -> Arc<AtomicUsize> {
    let issued = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/auth/token")))
        .respond_with(TokenResponder {
            issued: Arc::clone(&issued),
        })
        .mount(server)
        .await;
    issued
}

pub fn base_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{API_PREFIX}", server.uri())).unwrap()
}

pub fn executor(server: &MockServer, policy: RetryPolicy) -> Arc<RequestExecutor> {
    let client = build_http_client(5, 30).unwrap();
    let tokens = TokenManager::new(
        client.clone(),
        &base_url(server),
        Credential::new(USERNAME, SECRET),
    );
    Arc::new(RequestExecutor::new(client, tokens, policy))
}

pub fn page_body(ids: &[u64], page_number: u32, total_pages: u32) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "customer_name": "ACME Labs", "status": "COMPLETED"}))
        .collect();
    json!({
        "data": data,
        "page_number": page_number,
        "total_pages": total_pages,
        "total_count": ids.len()
    })
}

/// Mounts listing page `page_number` with the given report ids.
pub async fn mount_page(server: &MockServer, page_number: u32, total_pages: u32, ids: &[u64]) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .and(query_param("page_num", page_number.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(
            ids,
            page_number,
            total_pages,
        )))
        .mount(server)
        .await;
}

/// Mounts the detail for `id`; `artifact` is the artifact path on the same server.
pub async fn mount_detail(server: &MockServer, id: u64, artifact: Option<&str>) {
    let url = artifact.map(|p| format!("{}{p}", server.uri()));
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": id, "url": url, "customer_name": "ACME Labs"}
        })))
        .mount(server)
        .await;
}

pub async fn mount_artifact(server: &MockServer, artifact_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(artifact_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Number of received requests whose path equals `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

pub fn config(server: &MockServer, download_dir: &Path, skip_policy: SkipPolicy) -> Config {
    let base = base_url(server);
    let download_dir = download_dir.to_string_lossy().into_owned();
    let policy = skip_policy.to_string();
    Config::from_lookup(move |key| {
        match key {
            "QB_USERNAME" => Some(USERNAME.to_string()),
            "QB_SECRET" => Some(SECRET.to_string()),
            "DOWNLOAD_DIR" => Some(download_dir.clone()),
            "BASE_URL" => Some(base.to_string()),
            "QB_SKIP_POLICY" => Some(policy.clone()),
            "QB_READ_TIMEOUT_SECS" => Some("30".to_string()),
            _ => None,
        }
    })
    .unwrap()
}

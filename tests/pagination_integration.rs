//! Integration tests for report listing, detail and page traversal.

mod support;

use chrono::NaiveDate;
use qbench_sync_core::api::{ApiError, RetryPolicy};
use qbench_sync_core::reports::{ReportId, ReportsApi, next_page};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{API_PREFIX, base_url, executor, mount_page, mount_token_endpoint};

fn reports_api(server: &MockServer) -> ReportsApi {
    ReportsApi::new(executor(server, RetryPolicy::default()), base_url(server))
}

fn date_from() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 18).unwrap()
}

#[tokio::test]
async fn test_fetch_page_sends_listing_query() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .and(query_param("created_after", "2026-09-18"))
        .and(query_param("page_size", "50"))
        .and(query_param("page_num", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1001, "status": "COMPLETED"}, {"id": "2002"}],
            "page_number": 1,
            "total_pages": 1,
            "total_count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = reports_api(&server).fetch_page(date_from(), 1).await.unwrap();

    let ids: Vec<&str> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "2002"]);
    assert_eq!(page.page_number, 1);
    assert_eq!(page.total_pages, Some(1));
    assert_eq!(page.total_count, Some(2));
    assert_eq!(page.records[0].fields["status"], "COMPLETED");
}

#[tokio::test]
async fn test_walk_requests_exactly_total_pages() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    mount_page(&server, 1, 3, &[1, 2]).await;
    mount_page(&server, 2, 3, &[3, 4]).await;
    mount_page(&server, 3, 3, &[5]).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .and(query_param("page_num", "4"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let api = reports_api(&server);
    let mut requested = Vec::new();
    let mut seen = Vec::new();
    let mut page_number = Some(1);
    while let Some(n) = page_number {
        requested.push(n);
        let page = api.fetch_page(date_from(), n).await.unwrap();
        seen.extend(page.records.iter().map(|r| r.id.to_string()));
        page_number = next_page(&page);
    }

    assert_eq!(requested, vec![1, 2, 3]);
    assert_eq!(seen, vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_missing_page_number_falls_back_to_requested() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 9}],
            "total_pages": 4
        })))
        .mount(&server)
        .await;

    let page = reports_api(&server).fetch_page(date_from(), 2).await.unwrap();

    assert_eq!(page.page_number, 2);
    assert_eq!(next_page(&page), Some(3));
}

#[tokio::test]
async fn test_missing_total_pages_stops_walk() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}],
            "page_number": 1
        })))
        .mount(&server)
        .await;

    let page = reports_api(&server).fetch_page(date_from(), 1).await.unwrap();
    assert_eq!(page.total_pages, None);
    assert_eq!(next_page(&page), None);
}

#[tokio::test]
async fn test_empty_page_ends_walk_before_reported_total() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    mount_page(&server, 1, 5, &[1, 2]).await;
    mount_page(&server, 2, 5, &[]).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .and(query_param("page_num", "3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let api = reports_api(&server);
    let mut requested = Vec::new();
    let mut page_number = Some(1);
    while let Some(n) = page_number {
        requested.push(n);
        page_number = next_page(&api.fetch_page(date_from(), n).await.unwrap());
    }

    assert_eq!(requested, vec![1, 2]);
}

#[tokio::test]
async fn test_non_array_data_is_protocol_error() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": 1},
            "page_number": 1,
            "total_pages": 1
        })))
        .mount(&server)
        .await;

    let err = reports_api(&server)
        .fetch_page(date_from(), 1)
        .await
        .unwrap_err();

    match err {
        ApiError::Protocol { reason, .. } => assert!(reason.contains("object"), "reason: {reason}"),
        other => panic!("Expected Protocol, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_data_is_protocol_error() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_pages": 1})))
        .mount(&server)
        .await;

    let err = reports_api(&server)
        .fetch_page(date_from(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Protocol { .. }));
}

#[tokio::test]
async fn test_fetch_detail_reads_artifact_url() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    support::mount_detail(&server, 2002, Some("/files/2002.pdf")).await;
    support::mount_detail(&server, 1001, None).await;

    let api = reports_api(&server);
    let with_url = api.fetch_detail(&ReportId::from(2002)).await.unwrap();
    let without_url = api.fetch_detail(&ReportId::from(1001)).await.unwrap();

    assert_eq!(
        with_url.artifact_url(),
        Some(format!("{}/files/2002.pdf", server.uri()).as_str())
    );
    assert_eq!(without_url.artifact_url(), None);
}

#[tokio::test]
async fn test_fetch_detail_without_data_is_protocol_error() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/reports/5")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .mount(&server)
        .await;

    let err = reports_api(&server)
        .fetch_detail(&ReportId::from(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Protocol { .. }));
}

use std::time::Duration;

use carfinder_lib::{Category, FailureKind, RegionTable, RetryConfig, RetryingClient, SearchQuery};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(attempts: usize) -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(attempts)
        .with_backoff(Duration::ZERO)
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_retries_until_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/cta"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/cta"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let regions = RegionTable::with_base_url(&mock_server.uri()).unwrap();
    let region = regions.resolve("sandiego").unwrap();
    let client = RetryingClient::new(fast_config(3), None);

    let body = client
        .fetch_page(&region, &SearchQuery::new("Mazda CX-30"))
        .await
        .unwrap();

    assert_eq!(body, "<html>ok</html>");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_exhausted_attempts_report_last_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let regions = RegionTable::with_base_url(&mock_server.uri()).unwrap();
    let region = regions.resolve("sfbay").unwrap();
    let client = RetryingClient::new(fast_config(3), None);

    let err = client
        .fetch_page(&region, &SearchQuery::new("Mazda CX-30"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Status(503));
    assert_eq!(err.attempts, 3);
    assert_eq!(err.region, "sfbay");
    assert!(!err.is_fatal());
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let regions = RegionTable::with_base_url(&mock_server.uri()).unwrap();
    let region = regions.resolve("sandiego").unwrap();
    let config = fast_config(2).with_timeout(Duration::from_millis(50));
    let client = RetryingClient::new(config, None);

    let err = client
        .fetch_page(&region, &SearchQuery::new("Mazda CX-30"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
    assert_eq!(err.attempts, 2);
}

#[tokio::test]
async fn test_feed_requests_rss_format() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/cto"))
        .and(query_param("format", "rss"))
        .and(query_param("s", "120"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let regions = RegionTable::with_base_url(&mock_server.uri()).unwrap();
    let region = regions.resolve("sandiego").unwrap();
    let client = RetryingClient::new(fast_config(1), None);

    let query = carfinder_lib::Query::with_offset(
        SearchQuery::new("Mazda CX-30").with_category(Category::OwnerOnly),
        120,
    );
    let body = client.fetch_feed(&region, &query).await.unwrap();
    assert_eq!(body, "<rss/>");
}

#[tokio::test]
async fn test_rejected_proxy_is_not_retried() {
    let regions = RegionTable::new();
    let region = regions.resolve("sfbay").unwrap();
    let client = RetryingClient::new(fast_config(3), Some("not a proxy url"));

    let err = client
        .fetch_page(&region, &SearchQuery::new("Mazda CX-30"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind, FailureKind::Rejected(_)));
    assert_eq!(err.attempts, 1);
    assert!(err.is_fatal());
}

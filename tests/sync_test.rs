//! Sync layer tests: HTTP page store against wiremock, service behaviour
//! against in-process stores

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keyword_radar::sync::store::{Filter, PageStore, Sort, SortDirection};
use keyword_radar::sync::{
    InMemoryPageStore, NotionClient, Page, Properties, PropertyValue, StoreError, SyncService,
};

use common::{create_store_config, create_test_analyzer, page_json};

fn keyword_properties(keyword: &str) -> Properties {
    let mut properties = Properties::new();
    properties.insert("Keyword".into(), PropertyValue::Title(keyword.into()));
    properties.insert("Search Volume".into(), PropertyValue::Number(1500.0));
    properties
}

// ============================================================================
// HTTP page store
// ============================================================================

/// Create sends auth and version headers and decodes the returned page
#[tokio::test]
async fn test_create_page_headers_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .and(header("Authorization", "Bearer secret_test_token"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(body_partial_json(json!({
            "parent": {"database_id": "db-keywords"},
            "properties": {"Keyword": {"title": [{"text": {"content": "rust"}}]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("page-1", "rust")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let page = client
        .create_page("db-keywords", &keyword_properties("rust"))
        .await
        .unwrap();

    assert_eq!(page.id, "page-1");
    assert_eq!(page.text("Keyword"), Some("rust"));
    assert_eq!(page.number("Search Volume"), Some(1500.0));
    assert_eq!(page.text("Status"), Some("active"));
}

/// Query sends filter and sorts and parses every result
#[tokio::test]
async fn test_query_parses_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-keywords/query"))
        .and(body_partial_json(json!({
            "filter": {"property": "Keyword", "title": {"equals": "rust"}},
            "sorts": [{"timestamp": "last_edited_time", "direction": "descending"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [page_json("page-1", "rust"), page_json("page-2", "rust")],
            "has_more": false
        })))
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let filter = Filter::title_equals("Keyword", "rust");
    let pages = client
        .query(
            "db-keywords",
            Some(&filter),
            &[Sort::LastEdited(SortDirection::Descending)],
        )
        .await
        .unwrap();

    let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["page-1", "page-2"]);
}

/// Update uses PATCH on the page path
#[tokio::test]
async fn test_update_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/pages/page-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("page-1", "rust")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let page = client
        .update_page("page-1", &keyword_properties("rust"))
        .await
        .unwrap();
    assert_eq!(page.id, "page-1");
}

/// Server errors on a query are retried until the store answers
#[tokio::test]
async fn test_server_error_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-keywords/query"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/databases/db-keywords/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page_json("page-9", "rust")]
        })))
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let result = client.query("db-keywords", None, &[]).await;

    assert!(result.is_ok(), "Should succeed after retries: {:?}", result.err());
}

/// A create answered with 5xx may already exist, so it is not sent again
#[tokio::test]
async fn test_create_server_error_not_resent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let err = client
        .create_page("db-keywords", &keyword_properties("rust"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Status { status: 502, .. }));
}

/// A create that outlives the client timeout is reported, not repeated
#[tokio::test]
async fn test_create_timeout_not_resent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-keywords/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json("page-1", "rust"))
                .set_delay(std::time::Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = keyword_radar::config::StoreConfig {
        request_timeout_secs: 1,
        ..create_store_config(&mock_server.uri())
    };
    let service = SyncService::notion(&config).unwrap();
    let analysis = create_test_analyzer()
        .analyze_multi_portal("rust")
        .await
        .unwrap();

    let err = service.sync_keyword_analysis(&analysis).await.unwrap_err();
    assert!(matches!(err, StoreError::Timeout));
}

/// Long error bodies are cut down before they reach logs and reports
#[tokio::test]
async fn test_error_body_truncated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/pages/page-1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("x".repeat(5000)))
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let err = client
        .update_page("page-1", &keyword_properties("rust"))
        .await
        .unwrap_err();

    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body.chars().count(), 512);
            assert!(body.ends_with("..."));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Rate limiting is retried
#[tokio::test]
async fn test_rate_limit_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("page-3", "rust")))
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    assert!(client
        .create_page("db-keywords", &keyword_properties("rust"))
        .await
        .is_ok());
}

/// Client errors fail on the first attempt
#[tokio::test]
async fn test_400_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pages"))
        .respond_with(ResponseTemplate::new(400).set_body_string("validation_error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let err = client
        .create_page("db-keywords", &keyword_properties("rust"))
        .await
        .unwrap_err();

    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("validation_error"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Retries stop after the configured maximum
#[tokio::test]
async fn test_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    // max_retries = 2, so three attempts in total
    Mock::given(method("PATCH"))
        .and(path("/pages/page-1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let err = client
        .update_page("page-1", &keyword_properties("rust"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Status { status: 503, .. }));
}

/// A response without results is a decode error
#[tokio::test]
async fn test_query_without_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/databases/db-keywords/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "list"})))
        .mount(&mock_server)
        .await;

    let client = NotionClient::new(&create_store_config(&mock_server.uri())).unwrap();
    let err = client.query("db-keywords", None, &[]).await.unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

// ============================================================================
// Sync service
// ============================================================================

fn memory_service(store: Arc<InMemoryPageStore>) -> SyncService {
    SyncService::new(store, &create_store_config("http://localhost"))
}

/// Syncing the same keyword twice updates the first page
#[tokio::test]
async fn test_keyword_sync_is_idempotent() {
    let store = Arc::new(InMemoryPageStore::new());
    let service = memory_service(store.clone());
    let analyzer = create_test_analyzer();
    let analysis = analyzer.analyze_multi_portal("rust async").await.unwrap();

    let first = service.sync_keyword_analysis(&analysis).await.unwrap();
    let second = service.sync_keyword_analysis(&analysis).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.page_id, second.page_id);
    assert_eq!(store.pages("db-keywords").len(), 1);

    let found = service.get_keyword_analysis("rust async").await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(first.page_id));
}

/// Concurrent syncs of one keyword still produce a single page
#[tokio::test]
async fn test_concurrent_keyword_sync() {
    let store = Arc::new(InMemoryPageStore::new());
    let service = Arc::new(memory_service(store.clone()));
    let analyzer = create_test_analyzer();
    let analysis = analyzer.analyze_multi_portal("python tutorial").await.unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let analysis = analysis.clone();
            tokio::spawn(async move { service.sync_keyword_analysis(&analysis).await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().created {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(store.pages("db-keywords").len(), 1);
}

/// Recommendations are related to the upserted base keyword page
#[tokio::test]
async fn test_sync_recommendations() {
    let store = Arc::new(InMemoryPageStore::new());
    let service = memory_service(store.clone());
    let analyzer = create_test_analyzer();

    let base = analyzer.analyze_multi_portal("rust").await.unwrap();
    let candidates = analyzer.recommendations(&["rust"], None).unwrap();
    assert!(!candidates.is_empty());

    let report = service
        .sync_recommendations(&base, &candidates, None)
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.succeeded, candidates.len());

    let base_page = service.get_keyword_analysis("rust").await.unwrap().unwrap();
    let stored = service.get_recommendations(&base_page.id, 3).await.unwrap();
    assert_eq!(stored.len(), candidates.len().min(3));

    let scores: Vec<f64> = stored.iter().filter_map(|p| p.number("Score")).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

/// Trend history only returns points related to the keyword
#[tokio::test]
async fn test_trend_history() {
    let store = Arc::new(InMemoryPageStore::new());
    let service = memory_service(store.clone());
    let analyzer = create_test_analyzer();
    let trend = analyzer.trend_analysis("rust", Some(7)).unwrap();

    let report = service
        .batch_add_trend_points("kw-page", &trend, keyword_radar::Portal::Google, None)
        .await;
    assert_eq!(report.succeeded, 7);

    let history = service.get_trend_history("kw-page", 30).await.unwrap();
    assert_eq!(history.len(), 7);
    let dates: Vec<&str> = history.iter().filter_map(|p| p.text("Date")).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);

    assert!(service
        .get_trend_history("other-page", 30)
        .await
        .unwrap()
        .is_empty());
}

/// Fails every create call whose 1-based number is listed
struct FlakyStore {
    inner: InMemoryPageStore,
    calls: AtomicUsize,
    failing: Vec<usize>,
}

#[async_trait]
impl PageStore for FlakyStore {
    async fn create_page(
        &self,
        database_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&call) {
            return Err(StoreError::Status {
                status: 500,
                body: format!("call {call} failed"),
            });
        }
        self.inner.create_page(database_id, properties).await
    }

    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
        sorts: &[Sort],
    ) -> Result<Vec<Page>, StoreError> {
        self.inner.query(database_id, filter, sorts).await
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        self.inner.update_page(page_id, properties).await
    }
}

/// A failing item is reported and the batch continues
#[tokio::test]
async fn test_batch_partial_failure() {
    let store = Arc::new(FlakyStore {
        inner: InMemoryPageStore::new(),
        calls: AtomicUsize::new(0),
        failing: vec![2, 5],
    });
    let service = SyncService::new(store.clone(), &create_store_config("http://localhost"));
    let trend = create_test_analyzer().trend_analysis("rust", Some(7)).unwrap();

    let report = service
        .batch_add_trend_points("kw-page", &trend, keyword_radar::Portal::Google, None)
        .await;

    assert_eq!(report.attempted, 7);
    assert_eq!(report.succeeded, 5);
    let failed: Vec<usize> = report.failed.iter().map(|(index, _)| *index).collect();
    assert_eq!(failed, vec![1, 4]);
    assert!(!report.cancelled);
    assert_eq!(store.inner.pages("db-trends").len(), 5);
}

/// Flips the cancel signal after a number of creates
struct CancellingStore {
    inner: InMemoryPageStore,
    calls: AtomicUsize,
    cancel_after: usize,
    cancel: watch::Sender<bool>,
}

#[async_trait]
impl PageStore for CancellingStore {
    async fn create_page(
        &self,
        database_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let page = self.inner.create_page(database_id, properties).await?;
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_after {
            let _ = self.cancel.send(true);
        }
        Ok(page)
    }

    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
        sorts: &[Sort],
    ) -> Result<Vec<Page>, StoreError> {
        self.inner.query(database_id, filter, sorts).await
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        self.inner.update_page(page_id, properties).await
    }
}

/// Cancellation stops the batch before the next item
#[tokio::test]
async fn test_batch_cancellation() {
    let (tx, rx) = watch::channel(false);
    let store = Arc::new(CancellingStore {
        inner: InMemoryPageStore::new(),
        calls: AtomicUsize::new(0),
        cancel_after: 2,
        cancel: tx,
    });
    let service = SyncService::new(store.clone(), &create_store_config("http://localhost"));
    let trend = create_test_analyzer().trend_analysis("rust", Some(7)).unwrap();

    let report = service
        .batch_add_trend_points("kw-page", &trend, keyword_radar::Portal::Google, Some(&rx))
        .await;

    assert!(report.cancelled);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(store.inner.pages("db-trends").len(), 2);
}

/// A signal raised before the batch starts writes nothing
#[tokio::test]
async fn test_batch_cancelled_up_front() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let store = Arc::new(InMemoryPageStore::new());
    let service = memory_service(store.clone());
    let candidates = create_test_analyzer()
        .recommendations(&["rust"], None)
        .unwrap();

    let report = service
        .batch_add_recommendations("base", &candidates, Some(&rx))
        .await;

    assert!(report.cancelled);
    assert_eq!(report.attempted, 0);
    assert!(store.is_empty());
}

/// Prediction and intent pages relate to the keyword page
#[tokio::test]
async fn test_prediction_and_intent_records() {
    let store = Arc::new(InMemoryPageStore::new());
    let service = memory_service(store.clone());
    let analyzer = create_test_analyzer();

    let prediction = analyzer.predict("rust", Some(3)).unwrap();
    let profile = analyzer.seasonality("rust").unwrap();
    let intent = analyzer.search_intent("how to learn rust").unwrap();

    service
        .add_performance_prediction("kw-page", &prediction, Some(&profile))
        .await
        .unwrap();
    service.add_search_intent("kw-page", &intent).await.unwrap();

    let predictions = store.pages("db-prediction");
    assert_eq!(predictions.len(), 1);
    assert_eq!(
        predictions[0].get("Keyword").and_then(|v| v.as_list()),
        Some(&["kw-page".to_string()][..])
    );
    assert_eq!(store.pages("db-intent").len(), 1);
}

//! Wire-level tests for the literature search client against a mock server.

use medscan_agent::errors::{AnalysisError, ApiError, ErrorKind};
use medscan_agent::search::{LiteratureSearch, SearchClient, SearchResultItem};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/customsearch/v1";

fn client_for(server: &MockServer) -> SearchClient {
    SearchClient::default().with_base_url(server.uri())
}

#[tokio::test]
async fn test_single_item_parsed_exactly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"title": "A", "link": "http://x", "snippet": "s"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server)
        .search("anything", "key", "engine", 3)
        .await
        .unwrap();

    assert_eq!(
        items,
        vec![SearchResultItem {
            title: "A".to_string(),
            link: "http://x".to_string(),
            snippet: "s".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_request_carries_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("q", "Medical imaging abnormalities similar cases"))
        .and(query_param("key", "search-key"))
        .and(query_param("cx", "engine-7"))
        .and(query_param("num", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server)
        .search(
            "Medical imaging abnormalities similar cases",
            "search-key",
            "engine-7",
            3,
        )
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_forbidden_is_api_error_without_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-goog-request-id", "req-403")
                .set_body_json(json!({
                    "error": {"code": 403, "message": "API key not valid"}
                })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search("q", "bad-key", "engine", 3)
        .await
        .unwrap_err();

    match &err {
        ApiError::Api {
            status_code,
            message,
            request_id,
        } => {
            assert_eq!(*status_code, 403);
            assert!(message.contains("API key not valid"));
            assert_eq!(request_id.as_deref(), Some("req-403"));
        }
        other => panic!("expected an API error, got {other:?}"),
    }

    let analysis_error = AnalysisError::SearchCall(err);
    assert_eq!(analysis_error.kind(), ErrorKind::SearchCallFailure);
}

#[tokio::test]
async fn test_missing_items_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "customsearch#search",
            "searchInformation": {"totalResults": "0"}
        })))
        .mount(&server)
        .await;

    let items = client_for(&server)
        .search("q", "key", "engine", 3)
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_results_keep_service_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"title": "Third ranked first", "link": "https://c.example"},
                {"title": "Second", "link": "https://b.example", "snippet": "b"},
                {"title": "Last", "link": "https://a.example", "snippet": "a"}
            ]
        })))
        .mount(&server)
        .await;

    let items = client_for(&server)
        .search("q", "key", "engine", 3)
        .await
        .unwrap();

    let titles: Vec<_> = items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, ["Third ranked first", "Second", "Last"]);
    assert_eq!(items[0].snippet, "");
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search("q", "key", "engine", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_invalid_arguments_send_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for (key, engine, num) in [("", "engine", 3), ("key", "", 3), ("key", "engine", 0), ("key", "engine", 11)] {
        let err = client.search("q", key, engine, num).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)), "got {err:?}");
    }
}

//! Wire format and failure handling against a mock collection endpoint

use super::test_utils::{test_platform, NOW};
use datatag::config::HttpConfig;
use datatag::platform::ManualClock;
use datatag::{DataTaggingManager, HttpTransport, MemoryStore, TaggingConfig, Transport, TransportError};
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager_for(server: &MockServer) -> DataTaggingManager {
    let config = TaggingConfig::new(format!("{}/mpua", server.uri())).with_user_agent("ua-test");
    let transport = HttpTransport::new(&config.http, &config.user_agent).unwrap();
    DataTaggingManager::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(transport),
        test_platform(Arc::new(ManualClock::new(NOW))),
    )
    .unwrap()
}

#[tokio::test]
async fn test_event_is_sent_as_get_with_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mpua"))
        .and(header("user-agent", "ua-test"))
        .and(query_param("v", "1"))
        .and(query_param("t", "event"))
        .and(query_param("tid", "UA-FINNO"))
        .and(query_param("ea", "click"))
        .and(query_param("l", "buy_button"))
        .and(query_param("u.e", ""))
        .and(query_param("u.i", ""))
        .and(query_param("p", r#"{"fund":"K-USA","user_agent":"ua-test"}"#))
        .and(query_param("ph", "/fund/detail"))
        .and(query_param("et", "click"))
        .and(query_param("d", "ios"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let params = BTreeMap::from([("fund".to_string(), "K-USA".to_string())]);
    manager.log_event_parts("click", "buy_button", "click", "/fund/detail", Some(params));
    manager.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let query: Vec<(String, String)> = requests[0].url.query_pairs().into_owned().collect();
    let keys: Vec<&str> = query.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["v", "t", "tid", "cid", "ea", "l", "u.fss", "u.f", "u.e", "u.i", "p", "ph", "et", "d"]
    );
    server.verify().await;
}

#[tokio::test]
async fn test_server_errors_are_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mpua"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    manager.log_screen_view("/first", None);
    manager.log_screen_view("/second", None);
    manager.shutdown().await;

    server.verify().await;
}

#[tokio::test]
async fn test_transport_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpConfig::default(), "ua-test").unwrap();
    let result = transport
        .get(&format!("{}/mpua", server.uri()), &[("v", "1".to_string())])
        .await;
    assert!(matches!(result, Err(TransportError::Status(404))));
}

#[tokio::test]
async fn test_transport_reports_connect_failure() {
    let transport = HttpTransport::new(&HttpConfig::default(), "ua-test").unwrap();
    let result = transport.get("http://127.0.0.1:1/mpua", &[]).await;
    assert!(matches!(
        result,
        Err(TransportError::Connect(_)) | Err(TransportError::Request(_))
    ));
}

#[tokio::test]
async fn test_shared_client_transport_sends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mpua"))
        .and(header("user-agent", "shared-client"))
        .and(query_param("v", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .user_agent("shared-client")
        .build()
        .unwrap();
    let transport = HttpTransport::with_client(client);
    transport
        .get(&format!("{}/mpua", server.uri()), &[("v", "1".to_string())])
        .await
        .unwrap();
    server.verify().await;
}

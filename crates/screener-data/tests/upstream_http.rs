//! HTTP 업스트림 응답 분류 테스트.

use mockito::{Matcher, Server};
use screener_data::provider::{parse_symbol_list, symbol_list_request};
use screener_data::{HttpUpstreamClient, SubResource, UpstreamClient, UpstreamError};
use secrecy::SecretString;
use std::time::Duration;

fn client_for(server: &Server) -> HttpUpstreamClient {
    HttpUpstreamClient::new(
        server.url(),
        SecretString::from("test-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_success_returns_payload_with_api_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/quote/AAPL")
        .match_query(Matcher::UrlEncoded("apikey".into(), "test-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"symbol":"AAPL","price":190.5}]"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let payload = client
        .get(&SubResource::Quote.request("AAPL"))
        .await
        .unwrap();

    assert_eq!(payload[0]["symbol"], "AAPL");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_query_parameters_forwarded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/financial-statements/MSFT")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("period".into(), "annual".into()),
            Matcher::UrlEncoded("limit".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = client_for(&server);
    let payload = client
        .get(&SubResource::Financials.request("MSFT"))
        .await
        .unwrap();

    assert!(payload.as_array().is_some_and(|a| a.is_empty()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_429_is_throttled() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/ratios-ttm/AAPL")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let err = client_for(&server)
        .get(&SubResource::Ratios.request("AAPL"))
        .await
        .unwrap_err();
    assert_eq!(err, UpstreamError::Throttled);
}

#[tokio::test]
async fn test_limit_message_in_body_is_throttled() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/profile/AAPL")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"Error Message":"Limit Reach . Please upgrade your plan"}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .get(&SubResource::Profile.request("AAPL"))
        .await
        .unwrap_err();
    assert!(err.is_throttled());
}

#[tokio::test]
async fn test_server_error_is_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/key-metrics-ttm/AAPL")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let err = client_for(&server)
        .get(&SubResource::KeyMetrics.request("AAPL"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        UpstreamError::Status {
            status: 503,
            message: "maintenance".to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/financial-growth/AAPL")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let err = client_for(&server)
        .get(&SubResource::Growth.request("AAPL"))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Decode(_)));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = HttpUpstreamClient::new(
        "http://127.0.0.1:1",
        SecretString::from("super-secret-key".to_string()),
        Duration::from_secs(2),
    )
    .unwrap();

    let err = client
        .get(&SubResource::Quote.request("AAPL"))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Transport(_)));

    // 오류 메시지에 API 키가 노출되지 않아야 함
    let text = err.to_string();
    assert!(!text.contains("super-secret-key"), "{text}");
    assert!(!text.contains("apikey"), "{text}");
}

#[tokio::test]
async fn test_symbol_list_end_to_end() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/stock/list")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"[
                {"symbol":"AAPL","name":"Apple Inc.","exchangeShortName":"NASDAQ","type":"stock"},
                {"symbol":"QQQ","name":"Invesco QQQ","exchangeShortName":"NASDAQ","type":"etf"}
            ]"#,
        )
        .create_async()
        .await;

    let payload = client_for(&server)
        .get(&symbol_list_request())
        .await
        .unwrap();
    let listed = parse_symbol_list(payload).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].symbol.ticker, "AAPL");
}

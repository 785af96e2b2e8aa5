use bigdecimal::BigDecimal;
use serde_json::json;
use std::str::FromStr;
use winkel_pos::config::ScanConfig;
use winkel_pos::service::scan::{AiReceiptScanner, ScanError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scanner_for(server: &MockServer) -> AiReceiptScanner {
    let config = ScanConfig {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        model: "test-model".to_string(),
        api_key: Some("sk-test".to_string()),
        timeout_secs: 5,
    };
    AiReceiptScanner::from_config(&config)
        .expect("client builds")
        .expect("api key configured")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn scan_parses_items_wrapped_in_prose() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Here you go:\n```json\n[{\"product_name\": \"Appel Elstar\", \"quantity\": 12, \"price\": 0.35},\
             {\"product_name\": \"Bananen\", \"quantity\": 2.5, \"price\": 1.2}]\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let scanner = scanner_for(&server);
    let entries = scanner
        .scan(b"fake-image", "image/png", &["Appel Elstar".to_string()])
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].raw_name, "Appel Elstar");
    assert_eq!(entries[0].quantity, BigDecimal::from(12));
    assert_eq!(entries[1].quantity, BigDecimal::from_str("2.5").unwrap());
    assert_eq!(entries[1].unit_price, BigDecimal::from_str("1.2").unwrap());
}

#[tokio::test]
async fn upstream_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = scanner_for(&server)
        .scan(b"fake-image", "image/jpeg", &[])
        .await
        .unwrap_err();

    match err {
        ScanError::Upstream { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn completion_without_array_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("Sorry, I cannot read this image.")),
        )
        .mount(&server)
        .await;

    let err = scanner_for(&server)
        .scan(b"fake-image", "image/jpeg", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NoJsonArray));
}

#[tokio::test]
async fn invalid_item_rejects_whole_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "[{\"product_name\": \"Appel\", \"quantity\": 1, \"price\": 0.5},\
             {\"product_name\": \"Peer\", \"quantity\": 0, \"price\": 0.5}]",
        )))
        .mount(&server)
        .await;

    let err = scanner_for(&server)
        .scan(b"fake-image", "image/jpeg", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Schema { index: 1, .. }));
}

#[tokio::test]
async fn missing_completion_content_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = scanner_for(&server)
        .scan(b"fake-image", "image/jpeg", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::EmptyCompletion));
}

#[test]
fn scanner_is_disabled_without_api_key() {
    let config = ScanConfig {
        api_key: None,
        ..ScanConfig::default()
    };
    assert!(AiReceiptScanner::from_config(&config).unwrap().is_none());
}

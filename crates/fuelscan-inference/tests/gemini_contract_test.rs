//! HTTP contract tests for the Gemini backend against a wiremock server.

use fuelscan_inference::{ExtractionBackend, ExtractionError, GeminiBackend};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Smallest valid PNG signature plus IHDR chunk start, enough for magic-byte sniffing.
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

fn backend(server: &MockServer) -> GeminiBackend {
    GeminiBackend::new("test-key".to_string(), "gemini-2.5-flash".to_string())
        .with_base_url(server.uri())
}

fn candidate(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    })
}

#[tokio::test]
async fn test_extract_sends_image_and_schema() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/images/pin-17.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_BYTES))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"parts": [{}, {"inline_data": {"mime_type": "image/png"}}]}],
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate(r#"{"elementNumber":"E1","rows":[],"outliers":""}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = backend(&server)
        .extract(&format!("{}/images/pin-17.png", server.uri()))
        .await
        .expect("extraction should succeed");

    assert_eq!(text, r#"{"elementNumber":"E1","rows":[],"outliers":""}"#);
}

#[tokio::test]
async fn test_unknown_image_type_falls_back_to_jpeg() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/images/scan"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"parts": [{}, {"inline_data": {"mime_type": "image/jpeg"}}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let text = backend(&server)
        .extract(&format!("{}/images/scan", server.uri()))
        .await
        .unwrap();
    assert_eq!(text, "{}");
}

#[tokio::test]
async fn test_image_fetch_failure_is_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/images/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let err = backend(&server)
        .extract(&format!("{}/images/missing.png", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::Upstream {
            status: Some(404),
            ..
        }
    ));
}

#[tokio::test]
async fn test_vision_api_error_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/images/pin.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_BYTES))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .extract(&format!("{}/images/pin.png", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExtractionError::Upstream {
            status: Some(429),
            message: "quota exceeded".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let backend = GeminiBackend::new("k".to_string(), "m".to_string())
        .with_base_url("http://127.0.0.1:9");

    let err = backend
        .extract("http://127.0.0.1:9/images/pin.png")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::Upstream { status: None, .. }));
}

//! HTTP-level tests against a local `wiremock` server: the provider client,
//! artefact download, and the credits webhook.

use edgequake_pdf_translate::credits::{fetch_credit_balance_with, CreditBalanceCache};
use edgequake_pdf_translate::pipeline::download::download_to;
use edgequake_pdf_translate::pipeline::retry::RetryPolicy;
use edgequake_pdf_translate::pipeline::submit::SubmitParams;
use edgequake_pdf_translate::pipeline::upload::PdfUpload;
use edgequake_pdf_translate::provider::otranslator::OTranslatorClient;
use edgequake_pdf_translate::provider::ProviderStatus;
use edgequake_pdf_translate::translate::translate_with;
use edgequake_pdf_translate::{Backoff, TaskStatus, TranslateError, TranslationConfig, TranslationProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn client(server: &MockServer) -> OTranslatorClient {
    OTranslatorClient::new(
        &format!("{}/api/v1", server.uri()),
        "test-key",
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn upload() -> PdfUpload {
    PdfUpload::from_bytes(b"%PDF-1.4\n1 0 obj\nendobj\n", "report.pdf").unwrap()
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        backoff: Backoff::Linear,
    }
}

// ── Create ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_sends_multipart_with_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/create"))
        .and(header("authorization", "test-key"))
        .and(body_string_contains("name=\"toLang\""))
        .and(body_string_contains("name=\"fromLang\""))
        .and(body_string_contains("filename=\"report.pdf\""))
        .and(body_string_contains("%PDF-1.4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"taskId": "abc-123", "message": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create_task(&upload(), &SubmitParams::default())
        .await
        .unwrap();
    assert_eq!(created.task_id, "abc-123");
    assert_eq!(created.message.as_deref(), Some("queued"));
}

#[tokio::test]
async fn create_maps_error_statuses() {
    let cases = [
        (401, "auth"),
        (413, "too_large"),
        (502, "transient"),
        (400, "rejected"),
    ];
    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/translation/create"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_task(&upload(), &SubmitParams::default())
            .await
            .unwrap_err();
        let ok = match expected {
            "auth" => matches!(err, TranslateError::Auth { .. }),
            "too_large" => matches!(err, TranslateError::PayloadTooLarge { size: None, .. }),
            "transient" => err.is_transient(),
            _ => matches!(err, TranslateError::ProviderRejected { status: 400, .. }),
        };
        assert!(ok, "HTTP {status}: {err:?}");
    }
}

#[tokio::test]
async fn create_with_html_body_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/create"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_task(&upload(), &SubmitParams::default())
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

// ── Query ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_posts_task_id_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/query"))
        .and(header("authorization", "test-key"))
        .and(body_json(json!({"taskId": "abc-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Completed",
            "progress": 100,
            "translatedFileUrl": "https://x/y.pdf",
            "usedCredits": 10,
            "tokenCount": 5000
        })))
        .mount(&server)
        .await;

    let resp = client(&server).query_task("abc-123").await.unwrap();
    assert_eq!(resp.status, ProviderStatus::Completed);
    assert_eq!(resp.progress, Some(100));
}

#[tokio::test]
async fn query_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/query"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).query_task("gone").await.unwrap_err();
    assert!(matches!(err, TranslateError::NotFound { ref task_id } if task_id == "gone"));
}

#[tokio::test]
async fn query_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "Processing"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = OTranslatorClient::new(
        &format!("{}/api/v1", server.uri()),
        "test-key",
        Duration::from_secs(5),
        Duration::from_millis(200),
    )
    .unwrap();
    let err = client.query_task("slow").await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}

// ── Full job over HTTP ───────────────────────────────────────────────────────

#[tokio::test]
async fn full_job_against_mock_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskId": "abc-123"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/translation/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Completed",
            "translatedFileUrl": "https://x/y.pdf",
            "translatedBilingualFileUrl": "https://x/y.bi.pdf"
        })))
        .mount(&server)
        .await;

    let config = TranslationConfig::builder()
        .base_url(format!("{}/api/v1", server.uri()))
        .api_key("test-key")
        .schedule(edgequake_pdf_translate::PollSchedule {
            initial_interval: Duration::from_millis(10),
            ..Default::default()
        })
        .build()
        .unwrap();
    let provider: Arc<dyn TranslationProvider> =
        Arc::new(OTranslatorClient::from_config(&config).unwrap());

    let output = translate_with(provider, &upload(), &config).await.unwrap();
    assert_eq!(output.task.status, TaskStatus::Completed);
    assert_eq!(output.result.download_url(), Some("https://x/y.pdf"));
    assert_eq!(output.result.bilingual_file_url.as_deref(), Some("https://x/y.bi.pdf"));
}

// ── Download ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn download_writes_file_atomically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/y.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 translated".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested/out.pdf");
    let file = download_to(&format!("{}/files/y.pdf", server.uri()), &dest, 5)
        .await
        .unwrap();

    assert_eq!(file.bytes, 19);
    assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.7 translated");
    // Only the destination remains; the temp file was renamed.
    let entries: Vec<_> = std::fs::read_dir(dest.parent().unwrap()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn download_http_error_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("out.pdf");
    let err = download_to(&format!("{}/files/y.pdf", server.uri()), &dest, 5)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::DownloadFailed { ref reason, .. } if reason.contains("403")));
    assert!(!dest.exists());
}

// ── Credits webhook ──────────────────────────────────────────────────────────

#[tokio::test]
async fn credits_fetched_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"credits": 250})))
        .mount(&server)
        .await;

    let cache = CreditBalanceCache::new(Duration::from_secs(300));
    let url = format!("{}/credits", server.uri());
    let balance = fetch_credit_balance_with(&cache, &url, &fast_retries(), 5)
        .await
        .unwrap();

    assert_eq!(balance.credits, 250);
    assert!(!balance.from_cache);
    assert_eq!(cache.get(), Some(250));
}

#[tokio::test]
async fn credits_fall_back_to_cache_on_bad_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_string("credits: 100"))
        .expect(3)
        .mount(&server)
        .await;

    let cache = CreditBalanceCache::new(Duration::from_secs(300));
    cache.store(42);
    let url = format!("{}/credits", server.uri());
    let balance = fetch_credit_balance_with(&cache, &url, &fast_retries(), 5)
        .await
        .unwrap();

    assert_eq!(balance.credits, 42);
    assert!(balance.from_cache);
}

#[tokio::test]
async fn credits_fail_without_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = CreditBalanceCache::new(Duration::from_secs(300));
    let url = format!("{}/credits", server.uri());
    let err = fetch_credit_balance_with(&cache, &url, &fast_retries(), 5)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

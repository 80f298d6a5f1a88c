//! HTTP tests against a server bound to an ephemeral port, backed by the
//! in-memory store and a scripted extraction backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use fuelscan_api::{router, AppState};
use fuelscan_core::{
    ExtractionError, ExtractionOutput, InspectionRow, ResultFields, ResultRepository,
};
use fuelscan_db::MemoryStore;
use fuelscan_inference::mock::MockExtractionBackend;
use fuelscan_jobs::{Scheduler, SchedulerConfig};

struct TestServer {
    base_url: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn enqueue(&self, file_name: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/jobs"))
            .json(&json!({
                "file_name": file_name,
                "image_url": format!("https://img.example/{file_name}"),
            }))
            .send()
            .await
            .unwrap()
    }

    async fn process(&self) -> (u16, String) {
        let resp = self
            .client
            .post(self.url("/api/process-queue"))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.text().await.unwrap())
    }
}

async fn spawn_server(backend: MockExtractionBackend) -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let config = SchedulerConfig::default().with_throttle_ms(0);
    let scheduler = Scheduler::new(store.clone(), store.clone(), Arc::new(backend), &config);
    let app = router(AppState::new(store.clone(), store.clone(), scheduler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base_url: format!("http://{}", addr),
        store,
        client: reqwest::Client::new(),
    }
}

fn sample_output() -> ExtractionOutput {
    ExtractionOutput {
        element_number: "E-12".to_string(),
        rows: vec![
            InspectionRow {
                date: "2024-03-01".to_string(),
                address: "A1".to_string(),
                length: "3.2".to_string(),
                go_no_go: "GO".to_string(),
                ..Default::default()
            },
            InspectionRow {
                date: "2024-03-01".to_string(),
                address: "A2".to_string(),
                bow: "0.4".to_string(),
                notes: "chipped, cladding".to_string(),
                ..Default::default()
            },
        ],
        outliers: "none".to_string(),
    }
}

/// Enqueue one file, process it and return the result id.
async fn processed_result(server: &TestServer) -> Uuid {
    let resp = server.enqueue("pin-12.jpg").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let (status, text) = server.process().await;
    assert_eq!(status, 200);
    assert_eq!(text, "Processed 1 job");
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let body: Value = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_process_queue_with_no_jobs() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    assert_eq!(server.process().await, (200, "No jobs".to_string()));

    // GET triggers a run too.
    let resp = server
        .client
        .get(server.url("/api/process-queue"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "No jobs");
    assert_eq!(server.store.write_count(), 0);
}

#[tokio::test]
async fn test_enqueue_returns_id_and_status() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let resp = server.enqueue("pin-1.jpg").await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "QUEUED");
    assert!(body["id"].as_str().unwrap().parse::<Uuid>().is_ok());

    let jobs: Value = server
        .client
        .get(server.url("/api/jobs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["file_name"], "pin-1.jpg");
    assert_eq!(jobs[0]["attempts"], 0);
}

#[tokio::test]
async fn test_enqueue_rejects_missing_fields() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let resp = server
        .client
        .post(server.url("/api/jobs"))
        .json(&json!({ "file_name": "pin-1.jpg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing file_name or image_url");
}

#[tokio::test]
async fn test_enqueue_duplicate_file_conflicts() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let first: Value = server.enqueue("pin-1.jpg").await.json().await.unwrap();

    let resp = server.enqueue("pin-1.jpg").await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "File already exists");
    assert_eq!(body["existing_job_id"], first["id"]);
    assert_eq!(body["status"], "QUEUED");
}

#[tokio::test]
async fn test_enqueue_already_parsed_conflicts() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let result_id = Uuid::new_v4();
    server
        .store
        .upsert(
            result_id,
            &ResultFields {
                file_name: "legacy.jpg".to_string(),
                image_url: "https://img.example/legacy.jpg".to_string(),
                element_number: "E-1".to_string(),
                rows: vec![],
                notes: String::new(),
            },
        )
        .await
        .unwrap();

    let resp = server.enqueue("legacy.jpg").await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "ALREADY_PARSED");
    assert_eq!(body["parsed_file_id"], result_id.to_string());
}

#[tokio::test]
async fn test_process_queue_stores_result() {
    let backend = MockExtractionBackend::new().with_output(sample_output());
    let server = spawn_server(backend).await;
    let id = processed_result(&server).await;

    let result: Value = server
        .client
        .get(server.url(&format!("/api/results/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["element_number"], "E-12");
    assert_eq!(result["notes"], "none");
    assert_eq!(result["status"], "COMPLETED");
    assert_eq!(result["rows"].as_array().unwrap().len(), 2);

    let list: Value = server
        .client
        .get(server.url("/api/results"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    let stats: Value = server
        .client
        .get(server.url("/api/jobs/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["queued"], 0);
}

#[tokio::test]
async fn test_process_queue_reports_failure() {
    let backend = MockExtractionBackend::new().with_error(ExtractionError::EmptyResponse);
    let server = spawn_server(backend).await;
    server.enqueue("pin-1.jpg").await;

    assert_eq!(
        server.process().await,
        (200, "Job failed, will retry".to_string())
    );

    let stats: Value = server
        .client
        .get(server.url("/api/jobs/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["failed"], 1);
    assert_eq!(stats["exhausted"], 0);

    // Backoff holds the job back.
    assert_eq!(server.process().await, (200, "No jobs".to_string()));
}

#[tokio::test]
async fn test_process_queue_store_failure_is_500() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    server.enqueue("pin-1.jpg").await;
    server.store.set_fail_claims(true);

    assert_eq!(
        server.process().await,
        (500, "Failed to claim job".to_string())
    );
}

#[tokio::test]
async fn test_get_missing_result_is_404() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let resp = server
        .client
        .get(server.url(&format!("/api/results/{}", Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_update_result_applies_patch() {
    let backend = MockExtractionBackend::new().with_output(sample_output());
    let server = spawn_server(backend).await;
    let id = processed_result(&server).await;

    let resp = server
        .client
        .patch(server.url(&format!("/api/results/{id}")))
        .json(&json!({ "element_number": "E-13", "status": "QUEUED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let result: Value = server
        .client
        .get(server.url(&format!("/api/results/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["element_number"], "E-13");
    assert_eq!(result["notes"], "none");
    assert_eq!(result["status"], "COMPLETED");
}

#[tokio::test]
async fn test_update_result_without_fields_is_400() {
    let backend = MockExtractionBackend::new().with_output(sample_output());
    let server = spawn_server(backend).await;
    let id = processed_result(&server).await;

    let resp = server
        .client
        .patch(server.url(&format!("/api/results/{id}")))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No valid fields to update");
}

#[tokio::test]
async fn test_update_missing_result_is_404() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let resp = server
        .client
        .patch(server.url(&format!("/api/results/{}", Uuid::new_v4())))
        .json(&json!({ "notes": "checked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_review_sign_off() {
    let backend = MockExtractionBackend::new().with_output(sample_output());
    let server = spawn_server(backend).await;
    let id = processed_result(&server).await;
    let checks_url = server.url(&format!("/api/results/{id}/checks"));

    let resp = server
        .client
        .post(&checks_url)
        .json(&json!({ "reviewer": "phoebe", "checked": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["checked_by"], json!(["phoebe"]));

    server
        .client
        .post(&checks_url)
        .json(&json!({ "reviewer": "jay", "checked": true }))
        .send()
        .await
        .unwrap();
    server
        .client
        .post(&checks_url)
        .json(&json!({ "reviewer": "phoebe", "checked": false }))
        .send()
        .await
        .unwrap();

    let result: Value = server
        .client
        .get(server.url(&format!("/api/results/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["checked_by"], json!(["jay"]));

    let resp = server
        .client
        .post(&checks_url)
        .json(&json!({ "reviewer": " ", "checked": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing reviewer");

    let resp = server
        .client
        .post(server.url(&format!("/api/results/{}/checks", Uuid::new_v4())))
        .json(&json!({ "reviewer": "jay", "checked": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_store_failure_body_hides_details() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    server.store.set_fail_writes(true);
    let resp = server
        .client
        .post(server.url(&format!("/api/results/{}/checks", Uuid::new_v4())))
        .json(&json!({ "reviewer": "jay", "checked": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_export_csv() {
    let backend = MockExtractionBackend::new().with_output(sample_output());
    let server = spawn_server(backend).await;
    let id = processed_result(&server).await;

    let resp = server
        .client
        .get(server.url(&format!("/api/results/{id}/csv")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        resp.headers()["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"fuel_E-12.csv\""
    );

    let body = resp.text().await.unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Date,Address,Length,+r,r-,Bow,\u{394} Bow,\u{394} Length,Go-No Go,Notes"
    );
    assert!(lines[1].starts_with("\"2024-03-01\",\"A1\",\"3.2\""));
    assert!(lines[2].ends_with("\"chipped, cladding\""));
}

#[tokio::test]
async fn test_export_missing_result_is_404() {
    let server = spawn_server(MockExtractionBackend::new()).await;
    let resp = server
        .client
        .get(server.url(&format!("/api/results/{}/csv", Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

use super::handler::{SctidService, router};
use crate::server::config::{CliArgs, ServerConfig};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use clap::Parser;
use core::time::Duration;
use serde_json::{Value, json};
use std::collections::HashSet;
use tower::ServiceExt;

fn app() -> Router {
    let args = CliArgs::try_parse_from(["sctid-server", "--strategy=sequential"]).unwrap();
    let config = ServerConfig::try_from(args).unwrap();
    router(SctidService::new(&config))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn wait_for_job(app: &Router, id: &Value) -> Value {
    for _ in 0..500 {
        let (status, body) = send(app, Method::GET, &format!("/bulk/jobs/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "Finished" || body["status"] == "Error" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not complete");
}

async fn generate(app: &Router, body: Value) -> String {
    let (status, record) = send(app, Method::POST, "/sct/generate", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{record}");
    record["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn generate_lookup_and_publish() {
    let app = app();

    let id = generate(&app, json!({ "category": "concept" })).await;
    assert_eq!(id, "100005");

    let (status, record) = send(&app, Method::GET, "/sct/ids/100005", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "Assigned");
    assert_eq!(record["sequence"], 100);
    assert_eq!(record["partitionId"], "00");
    assert_eq!(record["namespace"], Value::Null);

    for _ in 0..2 {
        let (status, record) =
            send(&app, Method::PUT, "/sct/publish", Some(json!({ "id": id }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "Published");
    }

    let (status, body) = send(&app, Method::PUT, "/sct/release", Some(json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn reserve_register_release() {
    let app = app();

    let (status, record) = send(
        &app,
        Method::POST,
        "/sct/reserve",
        Some(json!({ "namespace": "1000154", "category": "description" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "Reserved");
    assert_eq!(record["namespace"], "1000154");
    let id = record["id"].as_str().unwrap().to_owned();

    let (status, record) =
        send(&app, Method::POST, "/sct/register", Some(json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "Assigned");

    let (status, record) = send(&app, Method::PUT, "/sct/release", Some(json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "Available");

    let (_, record) = send(&app, Method::GET, &format!("/sct/ids/{id}"), None).await;
    assert_eq!(record["status"], "Available");
}

#[tokio::test]
async fn unknown_identifiers_are_available() {
    let app = app();
    let (status, record) = send(&app, Method::GET, "/sct/ids/101013", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "Available");
}

#[tokio::test]
async fn bad_input_is_rejected() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/sct/ids/100006", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_identifier");

    let (status, body) =
        send(&app, Method::POST, "/sct/register", Some(json!({ "id": "abc" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_identifier");

    let (status, body) = send(
        &app,
        Method::POST,
        "/sct/generate",
        Some(json!({ "namespace": "12", "category": "concept" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _) = send(
        &app,
        Method::POST,
        "/sct/bulk/generate",
        Some(json!({ "category": "concept", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/sct/bulk/ids", Some(json!({ "ids": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/bulk/jobs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "job_not_found");
}

#[tokio::test]
async fn bulk_generate_runs_as_job() {
    let app = app();

    let (status, job) = send(
        &app,
        Method::POST,
        "/sct/bulk/generate",
        Some(json!({ "namespace": "1000154", "category": "description", "quantity": 25 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["operation"], "generate");
    assert_eq!(job["requested"], 25);

    let job = wait_for_job(&app, &job["id"]).await;
    assert_eq!(job["status"], "Finished");
    assert_eq!(job["completed"], 25);
    assert_eq!(job["cancelled"], false);

    let (status, records) =
        send(&app, Method::GET, &format!("/bulk/jobs/{}/records", job["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    let records = records.as_array().unwrap();
    let ids: HashSet<_> = records.iter().map(|record| record["id"].clone()).collect();
    assert_eq!(ids.len(), 25);
    assert!(records.iter().all(|record| record["status"] == "Assigned"));
}

#[tokio::test]
async fn bulk_register_is_all_or_nothing() {
    let app = app();

    let deprecated = generate(&app, json!({ "category": "concept" })).await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/sct/deprecate",
        Some(json!({ "id": deprecated })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, job) = send(
        &app,
        Method::POST,
        "/sct/bulk/register",
        Some(json!({ "ids": ["101013", deprecated] })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = wait_for_job(&app, &job["id"]).await;
    assert_eq!(job["status"], "Error");
    assert!(job["error"].as_str().unwrap().contains(&deprecated));

    let (_, record) = send(&app, Method::GET, "/sct/ids/101013", None).await;
    assert_eq!(record["status"], "Available");
}

#[tokio::test]
async fn bulk_publish_reports_failures() {
    let app = app();

    let assigned = generate(&app, json!({ "category": "concept" })).await;
    let (_, reserved) = send(
        &app,
        Method::POST,
        "/sct/reserve",
        Some(json!({ "category": "concept" })),
    )
    .await;
    let reserved = reserved["id"].as_str().unwrap().to_owned();

    let (status, job) = send(
        &app,
        Method::PUT,
        "/sct/bulk/publish",
        Some(json!({ "ids": [assigned, reserved] })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = wait_for_job(&app, &job["id"]).await;
    assert_eq!(job["status"], "Finished");
    assert_eq!(job["completed"], 1);
    assert_eq!(job["failures"][0]["id"], reserved.as_str());

    let (_, records) = send(
        &app,
        Method::GET,
        &format!("/sct/bulk/ids?ids={assigned},{reserved}"),
        None,
    )
    .await;
    assert_eq!(records[0]["status"], "Published");
    assert_eq!(records[1]["status"], "Reserved");
}

#[tokio::test]
async fn bulk_lookup_preserves_order() {
    let app = app();
    let id = generate(&app, json!({ "category": "concept" })).await;

    let (status, records) = send(
        &app,
        Method::POST,
        "/sct/bulk/ids",
        Some(json!({ "ids": ["101013", id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records[0]["id"], "101013");
    assert_eq!(records[0]["status"], "Available");
    assert_eq!(records[1]["id"], id.as_str());
    assert_eq!(records[1]["status"], "Assigned");
}

#[tokio::test]
async fn health_reports_serving() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
}

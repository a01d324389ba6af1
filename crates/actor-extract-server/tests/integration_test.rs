//! Integration tests for the API server
//!
//! Each test binds a server to an ephemeral port, sends real HTTP requests
//! and checks the JSON responses.

use std::io::{Cursor, Write};
use std::net::SocketAddr;

use actor_extract_core::{ActorExtractor, ProcessorConfig};
use actor_extract_server::{serve, ApiState};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use zip::write::{SimpleFileOptions, ZipWriter};

fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in members {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start file");
        zip.write_all(bytes).expect("write member");
    }
    zip.finish().expect("finish zip").into_inner()
}

async fn spawn_server(config: ProcessorConfig) -> SocketAddr {
    let extractor = ActorExtractor::new(config).expect("extractor");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        serve(listener, ApiState::new(extractor))
            .await
            .expect("Failed to run server");
    });
    addr
}

fn upload_form(bytes: Vec<u8>, content_type: &str) -> Form {
    let part = Part::bytes(bytes)
        .file_name("events.zip")
        .mime_str(content_type)
        .expect("valid mime");
    Form::new().part("file", part)
}

async fn upload(addr: SocketAddr, query: &str, form: Form) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/upload{query}"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send upload request");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Failed to parse JSON");
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_server(ProcessorConfig::with_workers(2)).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/health"))
        .await
        .expect("Failed to send health check request");
    assert_eq!(response.status(), 200);

    let json: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
    assert_eq!(json["max_workers"], 2);
    assert_eq!(json["max_file_size"], 100 * 1024 * 1024);
}

#[tokio::test]
async fn test_upload_extracts_actors() {
    let addr = spawn_server(ProcessorConfig::with_workers(2)).await;
    let archive = build_zip(&[(
        "events.json",
        br#"[{"actor":{"id":1,"login":"user1"}},{"actor":{"id":2,"login":"user2"}}]"#,
    )]);

    let (status, body) = upload(addr, "", upload_form(archive, "application/zip")).await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "files_processed": 1,
            "total_actors": 2,
            "actors": [{"id": 1, "login": "user1"}, {"id": 2, "login": "user2"}],
        })
    );
}

#[tokio::test]
async fn test_upload_with_diagnostics() {
    let addr = spawn_server(ProcessorConfig::with_workers(1)).await;
    let archive = build_zip(&[
        ("good.json", br#"{"actor": {"id": 1}}"#),
        ("bad.json", b"Invalid JSON data"),
    ]);

    let (status, body) = upload(
        addr,
        "?diagnostics=true",
        upload_form(archive, "application/zip"),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["files_processed"], 2);
    assert_eq!(body["total_actors"], 1);

    let entries = body["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 2);
    let bad = entries
        .iter()
        .find(|entry| entry["name"] == "bad.json")
        .expect("bad.json report");
    assert_eq!(bad["status"], "unparseable");
    assert_eq!(bad["actors"], 0);
}

#[tokio::test]
async fn test_invalid_content_type() {
    let addr = spawn_server(ProcessorConfig::with_workers(1)).await;
    let archive = build_zip(&[("events.json", br#"{"actor": 1}"#)]);

    let (status, body) = upload(addr, "", upload_form(archive, "text/plain")).await;

    assert_eq!(status, 400);
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("File must be"));
}

#[tokio::test]
async fn test_invalid_zip() {
    let addr = spawn_server(ProcessorConfig::with_workers(1)).await;

    let (status, body) = upload(
        addr,
        "",
        upload_form(b"not a zip file".to_vec(), "application/zip"),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("Invalid zip file"));
}

#[tokio::test]
async fn test_archive_without_json() {
    let addr = spawn_server(ProcessorConfig::with_workers(1)).await;
    let archive = build_zip(&[("readme.txt", b"hello")]);

    let (status, body) = upload(addr, "", upload_form(archive, "application/zip")).await;

    assert_eq!(status, 400);
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("No .json files"));
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let config = ProcessorConfig {
        max_file_size: 1024,
        ..ProcessorConfig::with_workers(1)
    };
    let addr = spawn_server(config).await;
    let payload = serde_json::to_vec(
        &(0..200)
            .map(|i| json!({"actor": {"id": i, "login": format!("user{i}")}}))
            .collect::<Vec<_>>(),
    )
    .expect("serialize");
    let archive = build_zip(&[("events.json", &payload)]);

    let (status, body) = upload(addr, "", upload_form(archive, "application/zip")).await;

    assert_eq!(status, 400);
    assert!(body["detail"].as_str().expect("detail").contains("exceeds"));
}

#[tokio::test]
async fn test_missing_file_field() {
    let addr = spawn_server(ProcessorConfig::with_workers(1)).await;
    let form = Form::new().text("note", "no archive here");

    let (status, body) = upload(addr, "", form).await;

    assert_eq!(status, 400);
    assert!(body["detail"].as_str().expect("detail").contains("'file'"));
}

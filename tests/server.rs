//! HTTP API tests: a real listener on `127.0.0.1:0`, driven with reqwest.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use skilltrack::catalogue::builtin;
use skilltrack::config::Config;
use skilltrack::location::Location;
use skilltrack::server::serve;
use skilltrack::session::Session;
use skilltrack::store::ProgressStore;

async fn start(local: &Path) -> String {
    let store = ProgressStore::new(Location::Local, local, &Config::default()).unwrap();
    let (session, _) = Session::open(Arc::new(builtin().unwrap()), store).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::new(Mutex::new(session))));
    format!("http://{}", addr)
}

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    client.get(url).send().await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp.path().join("progress.json")).await;

    let body = get_json(&reqwest::Client::new(), format!("{}/health", base)).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn setting_a_task_updates_progress_and_file() {
    let tmp = TempDir::new().unwrap();
    let local = tmp.path().join("progress.json");
    let base = start(&local).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/tasks/linux_basic_commands", base))
        .json(&json!({ "done": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["key"], "linux_basic_commands");
    assert_eq!(body["done"], true);
    assert_eq!(body["notices"], json!([]));

    let progress = get_json(&client, format!("{}/progress", base)).await;
    assert_eq!(progress["counts"]["completed"], 1);
    assert_eq!(progress["counts"]["total"], 189);
    let foundations = &progress["sections"][0];
    assert_eq!(foundations["key"], "foundations");
    assert_eq!(foundations["subsections"][0]["ratio"], 0.1);

    let document = get_json(&client, format!("{}/document", base)).await;
    assert_eq!(document["linux_basic_commands"], true);

    let on_disk: Value = serde_json::from_slice(&std::fs::read(&local).unwrap()).unwrap();
    assert_eq!(on_disk, document);
}

#[tokio::test]
async fn unknown_task_is_404_with_error_body() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp.path().join("progress.json")).await;

    let resp = reqwest::Client::new()
        .put(format!("{}/tasks/linux_nope", base))
        .json(&json!({ "done": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unknown_task");
    assert!(body["error"]["message"].as_str().unwrap().contains("linux_nope"));
}

#[tokio::test]
async fn notes_can_be_replaced() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp.path().join("progress.json")).await;
    let client = reqwest::Client::new();

    let notes = get_json(&client, format!("{}/notes", base)).await;
    assert_eq!(notes, json!({ "to_learn": "", "in_progress": "", "completed": "" }));

    let resp = client
        .put(format!("{}/notes", base))
        .json(&json!({ "to_learn": "eBPF", "completed": "Linux" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["notes"]["to_learn"], "eBPF");
    assert_eq!(body["notes"]["in_progress"], "");

    let notes = get_json(&client, format!("{}/notes", base)).await;
    assert_eq!(notes["completed"], "Linux");
}

#[tokio::test]
async fn catalogue_is_served() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp.path().join("progress.json")).await;

    let cat = get_json(&reqwest::Client::new(), format!("{}/catalogue", base)).await;
    let sections = cat["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 5);
    assert_eq!(sections[4]["key"], "sre");
}

#[tokio::test]
async fn reset_is_two_step() {
    let tmp = TempDir::new().unwrap();
    let local = tmp.path().join("progress.json");
    let base = start(&local).await;
    let client = reqwest::Client::new();

    client
        .put(format!("{}/tasks/k8s_pods", base))
        .json(&json!({ "done": true }))
        .send()
        .await
        .unwrap();

    // Confirming before requesting is a conflict.
    let resp = client
        .post(format!("{}/reset/confirm", base))
        .json(&json!({ "token": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "reset_not_requested");

    let requested = client.post(format!("{}/reset", base)).send().await.unwrap();
    let token = requested.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = client
        .post(format!("{}/reset/confirm", base))
        .json(&json!({ "token": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(local.exists());

    let resp = client
        .post(format!("{}/reset/confirm", base))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(!local.exists());

    let document = get_json(&client, format!("{}/document", base)).await;
    assert!(document.get("k8s_pods").is_none());
}

#[tokio::test]
async fn reset_can_be_cancelled() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp.path().join("progress.json")).await;
    let client = reqwest::Client::new();

    let token = client.post(format!("{}/reset", base)).send().await.unwrap().json::<Value>().await.unwrap()
        ["token"]
        .as_str()
        .unwrap()
        .to_string();

    let cancelled: Value = client.delete(format!("{}/reset", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(cancelled["cancelled"], true);

    let resp = client
        .post(format!("{}/reset/confirm", base))
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

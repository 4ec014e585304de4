mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use common::*;
use mockito::Matcher;
use phrasedrill_backend::routes::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(server: &mockito::Server, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = build_router(state_for(server));
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_and_categories() {
    let server = mockito::Server::new_async().await;

    let (status, body) = call(&server, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = call(&server, "GET", "/api/v1/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    let cats = body.as_array().unwrap();
    assert_eq!(cats.len(), 5);
    assert_eq!(cats[0]["key"], "sentenceRewrite");
    assert_eq!(cats[0]["label"], "句子改写 (Sentence Rewriting)");
    assert_eq!(cats[4]["maxCount"], 5);
}

#[tokio::test]
async fn post_exercises_returns_generated_set() {
    let mut server = mockito::Server::new_async().await;
    let m = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-1")
        .match_body(Matcher::PartialJson(json!({ "model": "m1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_body(&format!("```json\n{}\n```", sample_exercises())))
        .expect(1)
        .create_async()
        .await;

    let (status, body) = call(
        &server,
        "POST",
        "/api/v1/exercises",
        Some(json!({
            "provider": "siliconflow",
            "apiKey": "sk-1",
            "model": "m1",
            "topic": "to the degree that",
            "counts": { "sentenceRewrite": 0, "mcGrammar": 1, "mcContext": 0, "translation": 1, "logicalAnalysis": 0 }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, sample_exercises());
    m.assert_async().await;
}

#[tokio::test]
async fn post_exercises_maps_error_kinds_to_statuses() {
    let mut server = mockito::Server::new_async().await;
    let upstream = server
        .mock("POST", GEMINI_PATH)
        .with_status(500)
        .with_body("internal")
        .expect(1)
        .create_async()
        .await;

    let (status, body) = call(
        &server,
        "POST",
        "/api/v1/exercises",
        Some(json!({ "provider": "gemini", "apiKey": "g", "topic": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = call(
        &server,
        "POST",
        "/api/v1/exercises",
        Some(json!({ "provider": "siliconflow", "apiKey": "sk", "topic": "so that" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "configuration");

    let (status, body) = call(
        &server,
        "POST",
        "/api/v1/exercises",
        Some(json!({ "provider": "gemini", "apiKey": "g", "topic": "so that" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "upstream");
    assert!(body["message"].as_str().unwrap().contains("internal"));

    upstream.assert_async().await;
}

#[tokio::test]
async fn out_of_range_counts_are_rejected() {
    let server = mockito::Server::new_async().await;
    let (status, body) = call(
        &server,
        "POST",
        "/api/v1/exercises",
        Some(json!({ "provider": "gemini", "apiKey": "g", "topic": "so that", "counts": { "mcGrammar": 6 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn post_models_lists_catalog() {
    let mut server = mockito::Server::new_async().await;
    let m = server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer sk-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"id":"m1"},{"id":"m2"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let (status, body) = call(&server, "POST", "/api/v1/models", Some(json!({ "apiKey": "sk-1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "models": [{ "id": "m1", "displayName": "m1" }, { "id": "m2", "displayName": "m2" }] })
    );
    m.assert_async().await;

    let (status, body) = call(&server, "POST", "/api/v1/models", Some(json!({ "apiKey": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "configuration");
}

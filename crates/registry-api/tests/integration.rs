//! Integration tests: register/lookup, admin gates, aggregate, reset, audit.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use registry_api::server::{self, AppState, CALLER_HEADER};
use registry_core::{InMemoryAuditSink, Registry, RegistryConfig};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

const ADMIN: &str = "admin-a";

fn test_app_with(config: RegistryConfig) -> axum::Router {
    let registry = Arc::new(Registry::new(config).with_sink(Arc::new(InMemoryAuditSink::new())));
    server::router(Arc::new(AppState { registry }))
}

fn test_app() -> axum::Router {
    test_app_with(RegistryConfig::new(ADMIN))
}

async fn post(
    app: &axum::Router,
    uri: &str,
    caller: Option<&str>,
    body: serde_json::Value,
) -> serde_json::Value {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(c) = caller {
        builder = builder.header(CALLER_HEADER, c);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> serde_json::Value {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn register_then_get_record() {
    let app = test_app();
    let j = post(
        &app,
        "/registry/register",
        Some("bob"),
        json!({ "name": "Bob", "numeric_attribute": 70 }),
    )
    .await;
    assert_eq!(j["code"], 200);

    let j = get(&app, "/registry/record?id=bob").await;
    assert_eq!(j["code"], 200);
    assert_eq!(j["data"]["owner_id"], "bob");
    assert_eq!(j["data"]["display_name"], "Bob");
    assert_eq!(j["data"]["numeric_attribute"], 70);
    assert_eq!(j["data"]["active"], true);
}

#[tokio::test]
async fn missing_caller_header_is_rejected() {
    let app = test_app();
    let j = post(
        &app,
        "/registry/register",
        None,
        json!({ "name": "Bob", "numeric_attribute": 70 }),
    )
    .await;
    assert_eq!(j["code"], 400);
    let j = get(&app, "/registry/status").await;
    assert_eq!(j["data"]["total_count"], 0);
}

#[tokio::test]
async fn unknown_record_is_404() {
    let app = test_app();
    let j = get(&app, "/registry/record?id=ghost").await;
    assert_eq!(j["code"], 404);
    assert!(j["data"].is_null());

    let j = get(&app, "/registry/record").await;
    assert_eq!(j["code"], 400);
}

#[tokio::test]
async fn bob_and_cara_scenario_over_http() {
    let app = test_app();
    post(
        &app,
        "/registry/register",
        Some("bob"),
        json!({ "name": "Bob", "numeric_attribute": 70 }),
    )
    .await;
    let j = get(&app, "/registry/status").await;
    assert_eq!(j["data"]["total_count"], 1);
    post(
        &app,
        "/registry/register",
        Some("cara"),
        json!({ "name": "Cara", "numeric_attribute": 90 }),
    )
    .await;
    let j = get(&app, "/registry/status").await;
    assert_eq!(j["data"]["total_count"], 2);

    let j = get(&app, "/registry/aggregate").await;
    assert_eq!(j["data"]["aggregate"], 80);

    let j = post(
        &app,
        "/registry/deactivate",
        Some(ADMIN),
        json!({ "target_id": "bob" }),
    )
    .await;
    assert_eq!(j["code"], 200);
    let j = get(&app, "/registry/aggregate").await;
    assert_eq!(j["data"]["aggregate"], 90);

    let j = post(
        &app,
        "/registry/update_record",
        Some("bob"),
        json!({ "target_id": "cara", "numeric_attribute": 100 }),
    )
    .await;
    assert_eq!(j["code"], 403);
    let j = get(&app, "/registry/record?id=cara").await;
    assert_eq!(j["data"]["numeric_attribute"], 90);

    let j = post(
        &app,
        "/registry/update_record",
        Some(ADMIN),
        json!({ "target_id": "cara", "numeric_attribute": 100 }),
    )
    .await;
    assert_eq!(j["code"], 200);
    let j = get(&app, "/registry/record?id=cara").await;
    assert_eq!(j["data"]["numeric_attribute"], 100);
}

#[tokio::test]
async fn reset_closes_registry_until_reopened() {
    let app = test_app();
    post(
        &app,
        "/registry/register",
        Some("bob"),
        json!({ "name": "Bob", "numeric_attribute": 70 }),
    )
    .await;

    let j = post(&app, "/registry/reset", Some("bob"), json!({})).await;
    assert_eq!(j["code"], 403);

    let j = post(&app, "/registry/reset", Some(ADMIN), json!({})).await;
    assert_eq!(j["code"], 200);
    let j = get(&app, "/registry/status").await;
    assert_eq!(j["data"]["is_open"], false);
    assert_eq!(j["data"]["total_count"], 0);
    assert_eq!(j["data"]["record_count"], 1);

    let j = post(
        &app,
        "/registry/register",
        Some("cara"),
        json!({ "name": "Cara", "numeric_attribute": 90 }),
    )
    .await;
    assert_eq!(j["code"], 409);

    let j = post(&app, "/registry/reopen", Some(ADMIN), json!({})).await;
    assert_eq!(j["code"], 200);
    let j = post(
        &app,
        "/registry/register",
        Some("cara"),
        json!({ "name": "Cara", "numeric_attribute": 90 }),
    )
    .await;
    assert_eq!(j["code"], 200);
}

#[tokio::test]
async fn full_registry_returns_429() {
    let app = test_app_with(RegistryConfig::new(ADMIN).with_max_registrants(1));
    let j = post(
        &app,
        "/registry/register",
        Some("bob"),
        json!({ "name": "Bob", "numeric_attribute": 1 }),
    )
    .await;
    assert_eq!(j["code"], 200);
    let j = post(
        &app,
        "/registry/register",
        Some("cara"),
        json!({ "name": "Cara", "numeric_attribute": 2 }),
    )
    .await;
    assert_eq!(j["code"], 429);
}

#[tokio::test]
async fn audit_list_is_newest_first_and_paginated() {
    let app = test_app();
    for who in ["a", "b", "c"] {
        post(
            &app,
            "/registry/register",
            Some(who),
            json!({ "name": who, "numeric_attribute": 1 }),
        )
        .await;
    }
    post(&app, "/registry/close", Some(ADMIN), json!({})).await;

    let j = get(&app, "/registry/audit").await;
    let entries = j["data"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["kind"], "close");
    assert_eq!(entries[0]["seq"], 3);
    assert_eq!(entries[3]["caller_id"], "a");

    let j = get(&app, "/registry/audit?limit=2&offset=1").await;
    let entries = j["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["caller_id"], "c");
    assert_eq!(entries[1]["caller_id"], "b");

    let j = get(&app, "/registry/audit?caller_id=b").await;
    let entries = j["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "register");
}

#[tokio::test]
async fn list_records_sorted_by_owner() {
    let app = test_app();
    for who in ["zed", "amy"] {
        post(
            &app,
            "/registry/register",
            Some(who),
            json!({ "name": who, "numeric_attribute": 5 }),
        )
        .await;
    }
    let j = get(&app, "/registry/records").await;
    let records = j["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["owner_id"], "amy");
    assert_eq!(records[1]["owner_id"], "zed");
}

#[tokio::test]
async fn health() {
    let app = test_app();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

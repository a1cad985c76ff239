//! Concurrent item updates through the HTTP surface.

use futures_util::future::join_all;
use serde_json::json;

mod common;

async fn post_increment(server: &common::TestServer, id: u64, delta: i64) -> u16 {
    server
        .client
        .post(server.url(&format!("/warehouse_items/{}/increment", id)))
        .json(&json!({ "delta": delta }))
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

async fn get_then_put(server: &common::TestServer, id: u64) -> u16 {
    let (_, item) = server.get_json(&format!("/warehouse_items/{}", id)).await;
    let current = item["quantity"].as_u64().unwrap();
    server
        .client
        .put(server.url(&format!("/warehouse_items/{}", id)))
        .json(&json!({ "quantity": current + 1 }))
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

#[tokio::test]
async fn test_atomic_increments_lose_nothing() {
    let server = common::start_server(|config, _| {
        config.ledger.simulated_latency_ms = 5;
        config.ledger.max_update_attempts = 50;
    })
    .await;

    let statuses = join_all((0..10).map(|_| post_increment(&server, 1, 1))).await;
    assert!(statuses.iter().all(|s| *s == 200), "statuses: {:?}", statuses);

    let (_, item) = server.get_json("/warehouse_items/1").await;
    assert_eq!(item["quantity"], 20);
    assert_eq!(item["version"], 11);
}

#[tokio::test]
async fn test_bounded_atomic_increments_account_for_every_commit() {
    let server = common::start_server(|config, _| {
        config.ledger.simulated_latency_ms = 5;
        config.ledger.max_update_attempts = 2;
    })
    .await;

    let statuses = join_all((0..20).map(|_| post_increment(&server, 1, 1))).await;
    assert!(statuses.iter().all(|s| *s == 200 || *s == 409), "statuses: {:?}", statuses);
    let committed = statuses.iter().filter(|s| **s == 200).count() as u64;

    let (_, item) = server.get_json("/warehouse_items/1").await;
    assert_eq!(item["quantity"].as_u64().unwrap(), 10 + committed);
}

#[tokio::test]
async fn test_naive_read_then_write_races() {
    let server = common::start_server(|config, _| {
        config.ledger.simulated_latency_ms = 5;
    })
    .await;

    let statuses = join_all((0..10).map(|_| get_then_put(&server, 1))).await;
    // losing a race is the expected behaviour of this path, not a failure
    assert!(statuses.iter().all(|s| *s == 200 || *s == 409), "statuses: {:?}", statuses);
    let committed = statuses.iter().filter(|s| **s == 200).count() as u64;

    let (_, item) = server.get_json("/warehouse_items/1").await;
    assert_eq!(item["version"].as_u64().unwrap(), 1 + committed);
    assert!(item["quantity"].as_u64().unwrap() <= 20);
}

#[tokio::test]
async fn test_put_with_client_version() {
    let server = common::start_server(|_, _| {}).await;
    let put = |body: serde_json::Value| {
        server
            .client
            .put(server.url("/warehouse_items/1"))
            .json(&body)
            .send()
    };

    let res = put(json!({ "quantity": 5, "version": 1 })).await.unwrap();
    assert_eq!(res.status(), 200);
    let item: serde_json::Value = res.json().await.unwrap();
    assert_eq!(item["version"], 2);

    let res = put(json!({ "quantity": 6, "version": 1 })).await.unwrap();
    assert_eq!(res.status(), 409);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "version_conflict");
}

#[tokio::test]
async fn test_error_statuses() {
    let server = common::start_server(|_, _| {}).await;

    let (status, body) = server.get_json("/warehouse_items/404").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");

    assert_eq!(post_increment(&server, 1, -11).await, 400);
    assert_eq!(post_increment(&server, 404, 1).await, 404);

    let res = server
        .client
        .post(server.url("/warehouse_items/1/increment"))
        .json(&json!({ "delta": 1.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = server
        .client
        .put(server.url("/warehouse_items/1"))
        .json(&json!({ "quantity": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let (status, body) = server.get_json("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

mod common;

use axum::http::{StatusCode, header};
use axum_test::TestServer;
use serde_json::json;
use url_shortener::infrastructure::memory::MemoryStore;
use url_shortener::infrastructure::memory::store::URLS;

#[tokio::test]
async fn test_redirect_success() {
    let store = MemoryStore::new();
    let server = TestServer::new(common::create_test_app(&store).await).unwrap();

    let id = server
        .post("/")
        .text("https://example.com/landing")
        .await
        .json::<String>();

    let response = server.get(&format!("/{id}")).await;

    response.assert_status(StatusCode::FOUND);
    assert_eq!(
        response.header(header::LOCATION),
        "https://example.com/landing"
    );
}

#[tokio::test]
async fn test_redirect_not_found() {
    let store = MemoryStore::new();
    let server = TestServer::new(common::create_test_app(&store).await).unwrap();

    let response = server.get("/qW").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_redirect_invalid_id_not_found() {
    let store = MemoryStore::new();
    let server = TestServer::new(common::create_test_app(&store).await).unwrap();

    let response = server.get("/not-base62").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_redirect_malformed_record_is_500() {
    let store = MemoryStore::new();
    let server = TestServer::new(common::create_test_app(&store).await).unwrap();
    store.put(URLS, "5", json!({ "long_url": null })).await;

    let response = server.get("/5").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_every_accepted_url_redirects_with_location() {
    let store = MemoryStore::new();
    let server = TestServer::new(common::create_test_app(&store).await).unwrap();

    for body in [
        "https://example.com/a\nb",
        "https://example.com/caf\u{e9}?q=\u{1}",
        "https://example.com/plain",
    ] {
        let response = server.post("/").text(body).await;
        if response.status_code() != StatusCode::OK {
            continue;
        }

        let id = response.json::<String>();
        let redirect = server.get(&format!("/{id}")).await;

        redirect.assert_status(StatusCode::FOUND);
        assert_eq!(redirect.header(header::LOCATION), body.trim());
    }

    assert_eq!(store.len(URLS).await, 1);
}

//! Request handling against a live server.

use std::time::{Duration, SystemTime};

use reqwest::header::{
    ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG,
    IF_MODIFIED_SINCE, IF_NONE_MATCH,
};
use reqwest::{Method, StatusCode};
use tempfile::TempDir;

use static_cache::config::{AssetConfig, ServerConfig};

mod common;

const CONTENT1: &str = "3k24jkl 3k24jkl 3k24jkl 3k24jkl\n";
const CONTENT2: &str = "kljkljdaslfjdi3qj4j32kl4j2kljflkfaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn fixtures() -> (TempDir, ServerConfig) {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("testfile1.txt");
    let two = dir.path().join("testfile2.css");
    let root = dir.path().join("test.txt");
    std::fs::write(&one, CONTENT1).unwrap();
    std::fs::write(&two, CONTENT2).unwrap();
    std::fs::write(&root, CONTENT2).unwrap();

    let mut config = ServerConfig::default();
    config.assets = vec![
        AssetConfig::new("/", root).with_cache(0),
        AssetConfig::new("/one", one).with_cache(300),
        AssetConfig::new("/two", two).with_cache(301),
    ];
    (dir, config)
}

#[tokio::test]
async fn test_plain_text_with_cache_control() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let res = server.client.get(server.url("/one")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(res.headers()[CONTENT_LENGTH], "32");
    assert_eq!(res.headers()[CACHE_CONTROL], "max-age=300");
    assert_eq!(res.bytes().await.unwrap().len(), 32);
}

#[tokio::test]
async fn test_css_type_resolved_from_suffix() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let res = server.client.get(server.url("/two")).send().await.unwrap();
    assert_eq!(res.headers()[CONTENT_TYPE], "text/css");
    assert_eq!(res.headers()[CACHE_CONTROL], "max-age=301");
    assert_eq!(res.bytes().await.unwrap(), CONTENT2.as_bytes());
}

#[tokio::test]
async fn test_uncached_asset_has_no_cache_control() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let res = server.client.get(server.url("/")).send().await.unwrap();
    assert!(res.headers().get(CACHE_CONTROL).is_none());
    let length: usize = res.headers()[CONTENT_LENGTH].to_str().unwrap().parse().unwrap();
    assert_eq!(res.bytes().await.unwrap().len(), length);
}

#[tokio::test]
async fn test_repeated_get_is_identical() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let first = server.client.get(server.url("/two")).send().await.unwrap();
    let first_etag = first.headers()[ETAG].clone();
    let first_body = first.bytes().await.unwrap();

    let second = server.client.get(server.url("/two")).send().await.unwrap();
    assert_eq!(second.headers()[ETAG], first_etag);
    assert_eq!(second.bytes().await.unwrap(), first_body);
}

#[tokio::test]
async fn test_gzip_round_trip() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let res = server
        .client
        .get(server.url("/"))
        .header(ACCEPT_ENCODING, "gzip, deflate")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
    let length: usize = res.headers()[CONTENT_LENGTH].to_str().unwrap().parse().unwrap();
    let body = res.bytes().await.unwrap();
    assert_eq!(body.len(), length);
    assert!(length < CONTENT2.len());

    let raw = server.client.get(server.url("/")).send().await.unwrap();
    assert!(raw.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(common::gunzip(&body), raw.bytes().await.unwrap());
}

#[tokio::test]
async fn test_if_modified_since_in_future_is_not_modified() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let later = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(50));
    let res = server
        .client
        .get(server.url("/"))
        .header(IF_MODIFIED_SINCE, later)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert!(res.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_if_modified_since_serves_content() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let res = server
        .client
        .get(server.url("/"))
        .header(IF_MODIFIED_SINCE, "not a date")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_if_none_match_is_not_modified() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let etag = server.client.get(server.url("/")).send().await.unwrap().headers()[ETAG].clone();
    let res = server
        .client
        .get(server.url("/"))
        .header(IF_NONE_MATCH, etag.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(res.headers()[ETAG], etag);
    assert!(res.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_head_has_get_headers_and_no_body() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let get = server.client.get(server.url("/")).send().await.unwrap();
    let head = server.client.head(server.url("/")).send().await.unwrap();

    assert_eq!(head.status(), StatusCode::OK);
    for name in [CONTENT_TYPE, CONTENT_LENGTH, ETAG] {
        assert_eq!(head.headers().get(&name), get.headers().get(&name), "{}", name);
    }
    assert_eq!(head.headers()[CONTENT_LENGTH], CONTENT2.len().to_string().as_str());
    assert!(head.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;
    let before = server.table.get("/").unwrap();

    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let res = server
            .client
            .request(method, server.url("/"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    let after = server.table.get("/").unwrap();
    assert_eq!(after.etag, before.etag);
    assert_eq!(after.loaded_at, before.loaded_at);
}

#[tokio::test]
async fn test_unregistered_path_is_not_found() {
    let (_dir, config) = fixtures();
    let server = common::start_server(config).await;

    let res = server.client.get(server.url("/three")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

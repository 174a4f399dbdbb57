//! Integration tests for the sitemap cache
//!
//! These tests use wiremock to serve a sitemap index and its shards and
//! check what ends up in the per-day cache directory.

use chrono::NaiveDate;
use issnlister::config::Config;
use issnlister::harvest::build_http_client;
use issnlister::{CacheEpoch, IssnError, SitemapCache};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, cache_dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache.directory = cache_dir.to_path_buf();
    config.cache.sitemap_index = format!("{}/sitemap.xml", base_url);
    config.harvest.workers = 4;
    config.user_agent.name = "issnlister-test".to_string();
    config
}

fn epoch(cache_dir: &Path) -> CacheEpoch {
    CacheEpoch::new(cache_dir, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
}

fn create_cache(config: &Config) -> SitemapCache {
    let client = build_http_client(&config.user_agent).unwrap();
    SitemapCache::with_client(client, config, epoch(&config.cache.directory))
}

fn index_body(base_url: &str, shards: &[&str]) -> String {
    let entries: String = shards
        .iter()
        .map(|name| {
            format!(
                "<sitemap><loc>{}/{}</loc><lastmod>2026-10-01</lastmod></sitemap>",
                base_url, name
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        entries
    )
}

fn shard_body(ids: &[&str]) -> String {
    let urls: String = ids
        .iter()
        .map(|id| {
            format!(
                "<url><loc>https://portal.issn.org/resource/ISSN/{}</loc><changefreq>monthly</changefreq></url>",
                id
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        urls
    )
}

async fn mount_xml(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_second_build_is_served_from_cache() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    // Each document may be requested exactly once across both builds
    mount_xml(
        &server,
        "/sitemap.xml",
        index_body(&base_url, &["sitemap1.xml", "sitemap2.xml"]),
        1,
    )
    .await;
    mount_xml(&server, "/sitemap1.xml", shard_body(&["2049-3630", "0000-0019"]), 1).await;
    mount_xml(&server, "/sitemap2.xml", shard_body(&["1050-124X"]), 1).await;

    let first = create_cache(&config);
    let first_list = first.list().await.unwrap().to_vec();
    let first_bytes = std::fs::read(first.epoch().list_file()).unwrap();

    let second = create_cache(&config);
    let second_list = second.list().await.unwrap().to_vec();
    let second_bytes = std::fs::read(second.epoch().list_file()).unwrap();

    assert_eq!(first_list, vec!["0000-0019", "1050-124X", "2049-3630"]);
    assert_eq!(first_list, second_list);
    assert_eq!(first_bytes, second_bytes);

    // Shards are named after the last segment of their URL
    let epoch_dir = first.epoch().dir();
    assert!(epoch_dir.join("sitemap.xml").exists());
    assert!(epoch_dir.join("sitemap1.xml").exists());
    assert!(epoch_dir.join("sitemap2.xml").exists());
}

#[tokio::test]
async fn test_rebuild_after_deleting_list_reuses_cached_shards() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    mount_xml(&server, "/sitemap.xml", index_body(&base_url, &["sitemap1.xml"]), 1).await;
    mount_xml(&server, "/sitemap1.xml", shard_body(&["0000-0027", "0000-0019"]), 1).await;

    let cache = create_cache(&config);
    assert!(!cache.epoch().list_file().exists());
    cache.list().await.unwrap();
    let before = std::fs::read(cache.epoch().list_file()).unwrap();

    std::fs::remove_file(cache.epoch().list_file()).unwrap();
    let rebuilt = create_cache(&config);
    rebuilt.list().await.unwrap();

    assert_eq!(std::fs::read(rebuilt.epoch().list_file()).unwrap(), before);
}

#[tokio::test]
async fn test_duplicates_across_shards_are_listed_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    mount_xml(
        &server,
        "/sitemap.xml",
        index_body(&base_url, &["sitemap1.xml", "sitemap2.xml", "sitemap3.xml"]),
        1,
    )
    .await;
    mount_xml(&server, "/sitemap1.xml", shard_body(&["2049-3630", "0000-0019", "0000-0019"]), 1).await;
    mount_xml(&server, "/sitemap2.xml", shard_body(&["1050-124X", "2049-3630"]), 1).await;
    mount_xml(&server, "/sitemap3.xml", shard_body(&["0000-0019", "0003-200X"]), 1).await;

    let cache = create_cache(&config);
    let list = cache.list().await.unwrap();

    assert_eq!(list, ["0000-0019", "0003-200X", "1050-124X", "2049-3630"]);
    assert_eq!(
        std::fs::read_to_string(cache.epoch().list_file()).unwrap(),
        "0000-0019\n0003-200X\n1050-124X\n2049-3630\n"
    );
}

#[tokio::test]
async fn test_failed_shard_aborts_and_retry_resumes() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    mount_xml(
        &server,
        "/sitemap.xml",
        index_body(&base_url, &["sitemap1.xml", "sitemap2.xml"]),
        1,
    )
    .await;
    mount_xml(&server, "/sitemap1.xml", shard_body(&["0000-0019"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/sitemap2.xml"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let cache = create_cache(&config);
    let err = cache.list().await.unwrap_err();
    assert!(matches!(err, IssnError::HttpStatus { status: 500, .. }));

    // Completed downloads stay, nothing derived is written
    let epoch_dir = cache.epoch().dir();
    assert!(epoch_dir.join("sitemap1.xml").exists());
    assert!(!epoch_dir.join("sitemap2.xml").exists());
    assert!(!cache.epoch().list_file().exists());

    server.verify().await;
    server.reset().await;

    // Only the missing shard is requested on the next build
    mount_xml(&server, "/sitemap.xml", String::new(), 0).await;
    mount_xml(&server, "/sitemap1.xml", String::new(), 0).await;
    mount_xml(&server, "/sitemap2.xml", shard_body(&["1050-124X"]), 1).await;

    let retry = create_cache(&config);
    assert_eq!(retry.list().await.unwrap(), ["0000-0019", "1050-124X"]);
}

#[tokio::test]
async fn test_shard_named_like_a_cache_file_fails_the_build() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    mount_xml(
        &server,
        "/sitemap.xml",
        index_body(&base_url, &["sitemap1.xml", "a/sitemap.xml"]),
        1,
    )
    .await;
    // Names are checked before any shard is requested
    mount_xml(&server, "/sitemap1.xml", shard_body(&["1050-124X"]), 0).await;
    mount_xml(&server, "/a/sitemap.xml", shard_body(&["0000-0019"]), 0).await;

    let cache = create_cache(&config);
    let err = cache.list().await.unwrap_err();

    assert!(matches!(
        err,
        IssnError::ShardNameCollision { ref name, .. } if name == "sitemap.xml"
    ));
    assert!(!cache.epoch().list_file().exists());
}

#[tokio::test]
async fn test_malformed_index_is_not_retried() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    mount_xml(
        &server,
        "/sitemap.xml",
        "<sitemapindex><sitemap><loc>".to_string(),
        1,
    )
    .await;

    let cache = create_cache(&config);
    assert!(matches!(cache.list().await, Err(IssnError::Xml { .. })));

    // The cached copy is assumed complete; a second build fails the same way offline
    let again = create_cache(&config);
    assert!(matches!(again.list().await, Err(IssnError::Xml { .. })));
}

#[tokio::test]
async fn test_snapshot_matches_list() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    mount_xml(&server, "/sitemap.xml", index_body(&base_url, &["sitemap1.xml"]), 1).await;
    mount_xml(&server, "/sitemap1.xml", shard_body(&["0378-5955", "2049-3630"]), 1).await;

    let cache = create_cache(&config);
    let set = cache.snapshot().await.unwrap();

    assert_eq!(set.size(), 2);
    assert!(set.contains("0378-5955"));
    assert!(cache.epoch().snapshot_file().exists());
}

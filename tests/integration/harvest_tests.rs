//! Integration tests for the metadata harvest
//!
//! These tests use wiremock to serve record documents and run the batch
//! engine and full dumps against it.

use chrono::NaiveDate;
use issnlister::config::{Config, HarvestConfig, UserAgentConfig};
use issnlister::harvest::{build_http_client, BatchFetchEngine, Harvester, IgnoreSource};
use issnlister::{CacheEpoch, IssnError};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(issn: &str) -> String {
    format!(r#"{{"@graph":[{{"@id":"resource/ISSN/{}"}}]}}"#, issn)
}

fn harvest_config(workers: usize, batch_size: usize) -> HarvestConfig {
    HarvestConfig {
        workers,
        batch_size,
        retry_delay_ms: 0,
        ..HarvestConfig::default()
    }
}

fn create_engine(config: &HarvestConfig) -> BatchFetchEngine {
    let client = build_http_client(&UserAgentConfig::default()).unwrap();
    BatchFetchEngine::new(client, config)
}

fn link(base_url: &str, issn: &str) -> String {
    format!("{}/resource/ISSN/{}?format=json", base_url, issn)
}

async fn mount_record(server: &MockServer, issn: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/resource/ISSN/{}", issn)))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(record(issn)))
        .expect(times)
        .mount(server)
        .await;
}

/// Creates a full configuration whose sitemap must never be fetched
fn create_dump_config(base_url: &str, cache_dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache.directory = cache_dir.to_path_buf();
    config.cache.sitemap_index = format!("{}/sitemap.xml", base_url);
    config.harvest = harvest_config(2, 2);
    config.harvest.resource_url = format!("{}/resource/ISSN/{{issn}}?format=json", base_url);
    config
}

/// Writes today's identifier list directly, so no sitemap is needed
fn seed_list(cache_dir: &Path, ids: &[&str]) -> CacheEpoch {
    let epoch = CacheEpoch::new(cache_dir, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    std::fs::create_dir_all(epoch.dir()).unwrap();
    let content: String = ids.iter().map(|id| format!("{}\n", id)).collect();
    std::fs::write(epoch.list_file(), content).unwrap();
    epoch
}

async fn forbid_sitemap(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_retry_budget_is_exhausted_after_ten_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/ISSN/0000-0019"))
        .respond_with(ResponseTemplate::new(500))
        .expect(10)
        .mount(&server)
        .await;

    let engine = create_engine(&harvest_config(1, 1));
    let mut output = Vec::new();
    let err = engine
        .run(vec![link(&server.uri(), "0000-0019")], &mut output)
        .await
        .unwrap_err();

    match err {
        IssnError::RetriesExhausted { url, attempts } => {
            assert!(url.contains("0000-0019"));
            assert_eq!(attempts.len(), 10);
            assert!(attempts.iter().all(|a| a.contains("500")));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_exhausted_error_lists_every_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(10)
        .mount(&server)
        .await;

    let engine = create_engine(&harvest_config(1, 1));
    let err = engine
        .run(vec![link(&server.uri(), "0000-0019")], &mut Vec::new())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("after 10 attempts"));
    assert_eq!(message.matches("503 Service Unavailable").count(), 10);
}

#[tokio::test]
async fn test_undecodable_body_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/ISSN/2049-3630"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_record(&server, "2049-3630", 1).await;

    let engine = create_engine(&harvest_config(1, 1));
    let mut output = Vec::new();
    let stats = engine
        .run(vec![link(&server.uri(), "2049-3630")], &mut output)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), format!("{}\n", record("2049-3630")));
    assert_eq!(stats.items, 1);
}

#[tokio::test]
async fn test_skip_undecodable_moves_on() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/ISSN/2049-3630"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;
    mount_record(&server, "1050-124X", 1).await;

    let config = HarvestConfig {
        skip_undecodable: true,
        ..harvest_config(1, 3)
    };
    let engine = create_engine(&config);
    let mut output = Vec::new();
    let stats = engine
        .run(
            vec![
                link(&server.uri(), "2049-3630"),
                "# commented out".to_string(),
                link(&server.uri(), "1050-124X"),
            ],
            &mut output,
        )
        .await
        .unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), format!("{}\n", record("1050-124X")));
    assert_eq!(stats.items, 3);
    assert_eq!(stats.lines, 1);
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "issnlister-test/9.9 (https://example.org/bot)"))
        .respond_with(ResponseTemplate::new(200).set_body_string(record("0378-5955")))
        .expect(1)
        .mount(&server)
        .await;

    let user_agent = UserAgentConfig {
        name: "issnlister-test".to_string(),
        version: "9.9".to_string(),
        contact_url: "https://example.org/bot".to_string(),
    };
    let client = build_http_client(&user_agent).unwrap();
    let engine = BatchFetchEngine::new(client, &harvest_config(1, 1));

    engine
        .run(vec![link(&server.uri(), "0378-5955")], &mut Vec::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_output_follows_link_order() {
    let server = MockServer::start().await;
    let ids = ["0000-0019", "0000-0027", "0000-0035", "0000-0043", "0000-0051", "0000-0060"];

    // Earlier links answer slower, so workers finish in reverse order
    for (i, issn) in ids.iter().enumerate() {
        let delay = Duration::from_millis(20 * (ids.len() - i) as u64);
        Mock::given(method("GET"))
            .and(path(format!("/resource/ISSN/{}", issn)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(record(issn))
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let engine = create_engine(&harvest_config(3, 1));
    let links = ids.iter().map(|id| link(&server.uri(), id)).collect();
    let mut output = Vec::new();
    let stats = engine.run(links, &mut output).await.unwrap();

    let expected: String = ids.iter().map(|id| format!("{}\n", record(id))).collect();
    assert_eq!(String::from_utf8(output).unwrap(), expected);
    assert_eq!(stats.batches, ids.len());
}

#[tokio::test]
async fn test_resume_fetches_only_missing_records() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_dump_config(&base_url, &dir.path().join("cache"));

    let epoch = seed_list(
        &config.cache.directory,
        &["0000-0019", "0000-0027", "0000-0035", "1050-124X", "2049-3630"],
    );
    forbid_sitemap(&server).await;

    for done in ["0000-0019", "0000-0027", "0000-0035"] {
        mount_record(&server, done, 0).await;
    }
    mount_record(&server, "1050-124X", 1).await;
    mount_record(&server, "2049-3630", 1).await;

    let dump = dir.path().join("data.ndj");
    let complete = format!(
        "{}\n{}\n{}\n",
        record("0000-0019"),
        record("0000-0027"),
        record("0000-0035")
    );
    std::fs::write(&dump, format!("{}{{\"@graph\":[{{\"@id\":\"reso", complete)).unwrap();

    let harvester = Harvester::new(&config, epoch).unwrap();
    let stats = harvester.dump(&IgnoreSource::Resume(dump.clone())).await.unwrap();

    assert_eq!(stats.items, 2);
    assert_eq!(
        std::fs::read_to_string(&dump).unwrap(),
        format!("{}{}\n{}\n", complete, record("1050-124X"), record("2049-3630"))
    );
}

#[tokio::test]
async fn test_ignore_file_filters_links() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_dump_config(&base_url, &dir.path().join("cache"));

    let epoch = seed_list(&config.cache.directory, &["0000-0019", "0378-5955", "2049-3630"]);
    forbid_sitemap(&server).await;

    let ignore = dir.path().join("ignore.txt");
    std::fs::write(&ignore, "0378-5955\n\n9999-9999\n").unwrap();

    let harvester = Harvester::new(&config, epoch).unwrap();
    let plan = harvester.plan(&IgnoreSource::File(ignore)).await.unwrap();

    assert_eq!(
        plan.links,
        vec![link(&base_url, "0000-0019"), link(&base_url, "2049-3630")]
    );
    assert_eq!(plan.ignored, 1);
    assert!(plan.append_to.is_none());
}

#[tokio::test]
async fn test_failing_record_stops_dump() {
    let server = MockServer::start().await;
    mount_record(&server, "0000-0019", 1).await;
    Mock::given(method("GET"))
        .and(path("/resource/ISSN/0000-0027"))
        .respond_with(ResponseTemplate::new(404))
        .expect(10)
        .mount(&server)
        .await;
    mount_record(&server, "0000-0035", 0).await;

    // One worker, so nothing after the failing batch is dispatched
    let engine = create_engine(&harvest_config(1, 1));
    let links = ["0000-0019", "0000-0027", "0000-0035"]
        .iter()
        .map(|id| link(&server.uri(), id))
        .collect();
    let mut output = Vec::new();
    let err = engine.run(links, &mut output).await.unwrap_err();

    assert!(matches!(err, IssnError::RetriesExhausted { .. }));
    assert_eq!(String::from_utf8(output).unwrap(), format!("{}\n", record("0000-0019")));
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing site and drive the
//! real HTTP session through full crawls, checking what lands on disk.

use anjuke_harvest::config::{Config, OutputFormat, PacingConfig};
use anjuke_harvest::crawler::{run_crawl, run_detail_urls};
use anjuke_harvest::output::{read_keys, StopReason};
use anjuke_harvest::HarvestError;
use std::path::Path;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, regions: &[&str], output_path: &Path) -> Config {
    let mut config = Config::default();
    config.crawl.base_url = format!("{}/fangyuan", server.uri());
    config.crawl.regions = regions.iter().map(|r| r.to_string()).collect();
    config.crawl.max_pages = 5;
    config.pacing = PacingConfig {
        min_delay_ms: 0,
        max_delay_ms: 0,
        page_interval_ms: 0,
        settle_ms: 0,
        timeout_ms: 5000,
    };
    config.anti_detection.retry_delay_ms = 0;
    config.output.path = output_path.to_string_lossy().to_string();
    config.output.show_progress = false;
    config
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn catalog_page(ids: &[u32]) -> ResponseTemplate {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="zu-itemmod"><a href="/fangyuan/{}?shangquan=1" target="_blank">房源{}</a></div>"#,
                id, id
            )
        })
        .collect();
    html(format!(
        "<html><head><title>合肥租房</title></head><body><div class=\"list-content\">{}</div></body></html>",
        items
    ))
}

fn detail_page(id: u32, price: u32) -> ResponseTemplate {
    html(format!(
        r#"<html><head><title>整租 测试房源</title></head><body>
        <h1>整租 · 翡翠湖畔 2室1厅 {id}</h1>
        <div class="price"><strong>{price}</strong>元/月</div>
        <ul class="house-info-zufang">
            <li>户型：2室1厅1卫</li>
            <li>面积：88平米</li>
            <li>朝向：南北</li>
            <li>楼层：中层(共18层)</li>
        </ul>
        <p>房屋编码：{id}，更新时间：2024年3月2日</p>
        </body></html>"#
    ))
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn csv_house_ids(path: &Path) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open CSV output");
    let headers = reader.headers().expect("Missing CSV header").clone();
    let column = headers
        .iter()
        .position(|h| h == "house_id")
        .expect("house_id column");
    reader
        .records()
        .map(|row| row.expect("Bad CSV row")[column].to_string())
        .collect()
}

#[tokio::test]
async fn test_catalog_crawl_writes_csv() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");

    mount_get(&server, "/fangyuan/shushan/", catalog_page(&[111, 112, 113])).await;
    mount_get(&server, "/fangyuan/shushan/p2/", catalog_page(&[114])).await;
    mount_get(&server, "/fangyuan/shushan/p3/", catalog_page(&[])).await;
    mount_get(&server, "/fangyuan/111", detail_page(111, 2300)).await;
    mount_get(&server, "/fangyuan/112", detail_page(112, 1850)).await;
    mount_get(
        &server,
        "/fangyuan/113",
        html("<html><body><h1>该房源已下架</h1></body></html>".to_string()),
    )
    .await;
    mount_get(&server, "/fangyuan/114", detail_page(114, 4100)).await;

    let config = create_test_config(&server, &["shushan"], &output);
    let summary = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.stop_reason, StopReason::Exhausted);

    assert_eq!(csv_house_ids(&output), vec!["111", "112", "114"]);
}

#[tokio::test]
async fn test_record_ceiling_stops_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");

    mount_get(&server, "/fangyuan/", catalog_page(&[201, 202, 203])).await;
    mount_get(&server, "/fangyuan/201", detail_page(201, 2000)).await;
    mount_get(&server, "/fangyuan/202", detail_page(202, 2000)).await;
    Mock::given(method("GET"))
        .and(path("/fangyuan/203"))
        .respond_with(detail_page(203, 2000))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &[], &output);
    config.crawl.max_total_houses = 2;

    let summary = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.stop_reason, StopReason::RecordCeiling);
    assert_eq!(csv_house_ids(&output).len(), 2);
}

#[tokio::test]
async fn test_challenge_form_is_submitted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");
    let verification_log = dir.path().join("verification.csv");

    Mock::given(method("GET"))
        .and(path("/fangyuan/222"))
        .respond_with(html(
            r#"<html><head><title>安全验证</title></head><body>
            <form action="/antibot/verify" method="post">
                <input type="hidden" name="token" value="abc123">
                <button type="submit">点击按钮进行验证</button>
            </form></body></html>"#
                .to_string(),
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/antibot/verify"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/fangyuan/222"))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "/fangyuan/222", detail_page(222, 2600)).await;

    let mut config = create_test_config(&server, &[], &output);
    config.output.verification_log = Some(verification_log.to_string_lossy().to_string());

    let url = Url::parse(&format!("{}/fangyuan/222", server.uri())).unwrap();
    let summary = run_detail_urls(&config, "test-hash", &[url])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.failures, 0);
    assert_eq!(csv_house_ids(&output), vec!["222"]);

    let log = std::fs::read_to_string(&verification_log).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "timestamp,url,outcome,attempts,duration_secs");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("/fangyuan/222,SUCCESS,1,"));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");

    mount_get(&server, "/fangyuan/", catalog_page(&[301, 302])).await;
    Mock::given(method("GET"))
        .and(path("/fangyuan/301"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_get(&server, "/fangyuan/302", detail_page(302, 3000)).await;
    mount_get(&server, "/fangyuan/p2/", catalog_page(&[])).await;

    let mut config = create_test_config(&server, &[], &output);
    config.anti_detection.max_retries = 2;

    let summary = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.failures, 1);
    assert_eq!(csv_house_ids(&output), vec!["302"]);
}

#[tokio::test]
async fn test_dedup_against_previous_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");

    mount_get(&server, "/fangyuan/", catalog_page(&[401, 402])).await;
    mount_get(&server, "/fangyuan/p2/", catalog_page(&[])).await;
    mount_get(&server, "/fangyuan/401", detail_page(401, 2000)).await;
    mount_get(&server, "/fangyuan/402", detail_page(402, 2100)).await;

    let mut config = create_test_config(&server, &[], &output);
    config.output.append = true;
    config.output.dedup = true;

    let first = run_crawl(&config, "test-hash").await.expect("First crawl failed");
    assert_eq!(first.accepted, 2);

    let second = run_crawl(&config, "test-hash").await.expect("Second crawl failed");
    assert_eq!(second.accepted, 0);
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.failures, 0);

    let keys = read_keys(&output).unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(csv_house_ids(&output), vec!["401", "402"]);
}

#[tokio::test]
async fn test_dedup_with_overwritten_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");

    mount_get(&server, "/fangyuan/", catalog_page(&[451, 452])).await;
    mount_get(&server, "/fangyuan/p2/", catalog_page(&[])).await;
    mount_get(&server, "/fangyuan/451", detail_page(451, 2000)).await;
    mount_get(&server, "/fangyuan/452", detail_page(452, 2100)).await;

    let mut config = create_test_config(&server, &[], &output);
    let first = run_crawl(&config, "test-hash").await.expect("First crawl failed");
    assert_eq!(first.accepted, 2);

    config.output.append = false;
    config.output.dedup = true;

    let second = run_crawl(&config, "test-hash").await.expect("Second crawl failed");
    assert_eq!(second.accepted, 0);
    assert_eq!(second.duplicates, 2);
    assert!(csv_house_ids(&output).is_empty());
}

#[tokio::test]
async fn test_sqlite_output_records_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.db");

    mount_get(&server, "/fangyuan/", catalog_page(&[501])).await;
    mount_get(&server, "/fangyuan/p2/", catalog_page(&[])).await;
    mount_get(&server, "/fangyuan/501", detail_page(501, 2750)).await;

    let mut config = create_test_config(&server, &[], &output);
    config.output.format = OutputFormat::Sqlite;

    let summary = run_crawl(&config, "sqlite-hash").await.expect("Crawl failed");
    assert_eq!(summary.accepted, 1);

    let conn = rusqlite::Connection::open(&output).unwrap();
    let (house_id, price): (String, i64) = conn
        .query_row("SELECT house_id, price FROM listings", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(house_id, "501");
    assert_eq!(price, 2750);

    let (hash, status, accepted, pages): (String, String, i64, i64) = conn
        .query_row(
            "SELECT config_hash, status, accepted, pages_visited FROM runs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(hash, "sqlite-hash");
    assert_eq!(status, "completed");
    assert_eq!(accepted, 1);
    assert_eq!(pages, 2);
}

#[tokio::test]
async fn test_bad_proxy_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("houses.csv");

    let mut config = create_test_config(&server, &[], &output);
    config.anti_detection.proxies = vec!["::not a proxy".to_string()];

    let result = run_crawl(&config, "test-hash").await;
    assert!(matches!(result, Err(HarvestError::Session(_))));
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the real
//! HTTP fetcher and robots.txt oracle through full crawls.

use std::collections::HashMap;
use tempfile::TempDir;
use webweave::config::{Config, CrawlerConfig, RobotsConfig, StorageConfig, UserAgentConfig};
use webweave::parser::ParseData;
use webweave::{CrawlController, Depth, Page, WebCrawler};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration, optionally persisting doc ids in `db_path`
fn create_test_config(crawler: CrawlerConfig, db_path: Option<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            politeness_delay: 0,
            idle_wait: 50,
            number_of_crawlers: 2,
            ..crawler
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        robots: RobotsConfig::default(),
        storage: StorageConfig {
            doc_id_database: db_path,
        },
        seeds: vec![],
    }
}

#[derive(Default)]
struct CollectingCrawler {
    visited: Vec<Page>,
}

impl WebCrawler for CollectingCrawler {
    fn visit(&mut self, page: &Page) -> anyhow::Result<()> {
        self.visited.push(page.clone());
        Ok(())
    }
}

/// Runs a crawl from the server root and returns the visited pages by path
async fn crawl(server: &MockServer, config: &Config) -> (CrawlController, HashMap<String, Page>) {
    let controller = CrawlController::from_config(config, false).expect("Failed to build controller");
    crawl_with(server, controller).await
}

async fn crawl_with(
    server: &MockServer,
    controller: CrawlController,
) -> (CrawlController, HashMap<String, Page>) {
    controller
        .add_seed(&format!("{}/", server.uri()))
        .await
        .expect("Failed to add seed");

    let crawlers = controller
        .start(CollectingCrawler::default, config_crawlers(&controller))
        .await
        .expect("Crawl failed");

    let pages = crawlers
        .into_iter()
        .flat_map(|crawler| crawler.visited)
        .map(|page| {
            let path = url::Url::parse(&page.web_url.url)
                .expect("Visited URL should parse")
                .path()
                .to_string();
            (path, page)
        })
        .collect();

    (controller, pages)
}

fn config_crawlers(controller: &CrawlController) -> usize {
    controller.config().number_of_crawlers
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body).into_bytes(),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/page1">Page 1</a><a href="/page2">Page 2</a>"#),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        html(r#"<a href="/">Home</a><a href="/page3">Page 3</a>"#),
    )
    .await;
    mount_page(&mock_server, "/page2", html("<p>Leaf</p>")).await;
    mount_page(&mock_server, "/page3", html("<p>Deep leaf</p>")).await;

    let config = create_test_config(CrawlerConfig::default(), None);
    let (controller, pages) = crawl(&mock_server, &config).await;

    assert_eq!(pages.len(), 4, "Visited: {:?}", pages.keys());
    assert_eq!(pages["/"].web_url.depth, Depth::Fresh(0));
    assert_eq!(pages["/page1"].web_url.depth, Depth::Fresh(1));
    assert_eq!(pages["/page2"].web_url.depth, Depth::Fresh(1));
    assert_eq!(pages["/page3"].web_url.depth, Depth::Fresh(2));

    // Page 3 was discovered from page 1
    assert_eq!(
        pages["/page3"].web_url.parent_doc_id,
        pages["/page1"].web_url.doc_id
    );

    // The link back home is a rediscovery
    let home_link = &pages["/page1"].html().unwrap().outgoing_urls[0];
    assert_eq!(home_link.depth, Depth::AlreadySeen);
    assert_eq!(home_link.doc_id, pages["/"].web_url.doc_id);

    let stats = controller.stats().snapshot();
    assert_eq!(stats.pages_visited, 4);
    assert_eq!(stats.links_scheduled, 3);
    assert!(controller.frontier().is_finished());
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/private/secret">Secret</a><a href="/public">Public</a>"#),
    )
    .await;
    mount_page(&mock_server, "/public", html("<p>Public</p>")).await;

    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("<p>Secret</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(CrawlerConfig::default(), None);
    let (_, pages) = crawl(&mock_server, &config).await;

    assert!(pages.contains_key("/public"));
    assert!(!pages.contains_key("/private/secret"));
}

#[tokio::test]
async fn test_redirect_followed() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", html(r#"<a href="/old">Old</a>"#)).await;
    mount_page(
        &mock_server,
        "/old",
        ResponseTemplate::new(301).insert_header("Location", "/new"),
    )
    .await;
    mount_page(&mock_server, "/new", html("<p>New home</p>")).await;

    let config = create_test_config(CrawlerConfig::default(), None);
    let (controller, pages) = crawl(&mock_server, &config).await;

    assert!(pages.contains_key("/new"));
    assert!(!pages.contains_key("/old"));
    assert_eq!(pages["/new"].web_url.depth, Depth::Fresh(1));
    assert_eq!(pages["/new"].web_url.parent_doc_id, pages["/"].web_url.doc_id);
    assert_eq!(controller.stats().snapshot().redirects_followed, 1);
}

#[tokio::test]
async fn test_redirect_ignored_when_disabled() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", html(r#"<a href="/old">Old</a>"#)).await;
    mount_page(
        &mock_server,
        "/old",
        ResponseTemplate::new(302).insert_header("Location", "/new"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html("<p>New home</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawler = CrawlerConfig {
        follow_redirects: false,
        ..CrawlerConfig::default()
    };
    let config = create_test_config(crawler, None);
    let (_, pages) = crawl(&mock_server, &config).await;

    assert_eq!(pages.len(), 1);
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", html(r#"<a href="/level1">1</a>"#)).await;
    mount_page(&mock_server, "/level1", html(r#"<a href="/level2">2</a>"#)).await;

    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html("<p>Too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawler = CrawlerConfig {
        max_depth: 1,
        ..CrawlerConfig::default()
    };
    let config = create_test_config(crawler, None);
    let (_, pages) = crawl(&mock_server, &config).await;

    assert_eq!(pages.len(), 2);
    assert!(pages.contains_key("/level1"));
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/notes.txt">Notes</a><a href="/report.pdf">Report</a>"#),
    )
    .await;
    mount_page(
        &mock_server,
        "/notes.txt",
        ResponseTemplate::new(200).set_body_raw("plain notes", "text/plain; charset=utf-8"),
    )
    .await;
    mount_page(
        &mock_server,
        "/report.pdf",
        ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
    )
    .await;

    let config = create_test_config(CrawlerConfig::default(), None);
    let (controller, pages) = crawl(&mock_server, &config).await;

    assert!(matches!(
        &pages["/notes.txt"].parse_data,
        Some(ParseData::Text(text)) if text.text == "plain notes"
    ));
    assert!(!pages.contains_key("/report.pdf"));
    assert_eq!(controller.stats().snapshot().parse_errors, 1);
}

#[tokio::test]
async fn test_binary_content_included() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", html(r#"<a href="/logo.png">Logo</a>"#)).await;
    mount_page(
        &mock_server,
        "/logo.png",
        ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"),
    )
    .await;

    let crawler = CrawlerConfig {
        include_binary_content: true,
        ..CrawlerConfig::default()
    };
    let config = create_test_config(crawler, None);
    let (_, pages) = crawl(&mock_server, &config).await;

    assert!(matches!(
        &pages["/logo.png"].parse_data,
        Some(ParseData::Binary(binary)) if binary.content == vec![0x89, 0x50, 0x4e, 0x47]
    ));
}

#[tokio::test]
async fn test_page_too_big() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/", html(&"x".repeat(2048))).await;

    let crawler = CrawlerConfig {
        max_download_size: 512,
        ..CrawlerConfig::default()
    };
    let config = create_test_config(crawler, None);
    let (controller, pages) = crawl(&mock_server, &config).await;

    assert!(pages.is_empty());
    assert_eq!(controller.stats().snapshot().pages_too_big, 1);
}

#[tokio::test]
async fn test_status_errors_reported() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/missing">Missing</a><a href="/broken">Broken</a>"#),
    )
    .await;
    mount_page(&mock_server, "/broken", ResponseTemplate::new(500)).await;

    let config = create_test_config(CrawlerConfig::default(), None);
    let (controller, pages) = crawl(&mock_server, &config).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(controller.stats().snapshot().status_rejections, 2);
}

#[tokio::test]
async fn test_second_run_skips_seen_urls() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("docids.db");

    mount_page(&mock_server, "/", html(r#"<a href="/page">Page</a>"#)).await;
    mount_page(&mock_server, "/page", html("<p>Page</p>")).await;

    let config = create_test_config(
        CrawlerConfig::default(),
        Some(db_path.to_string_lossy().to_string()),
    );

    let (_, first) = crawl(&mock_server, &config).await;
    assert_eq!(first.len(), 2);

    let (_, second) = crawl(&mock_server, &config).await;
    assert!(second.is_empty());

    let controller = CrawlController::from_config(&config, true).unwrap();
    let (_, fresh) = crawl_with(&mock_server, controller).await;
    assert_eq!(fresh.len(), 2);
}

/// Visits one page and then interrupts the crawl it belongs to
struct InterruptingCrawler {
    controller: std::sync::Arc<CrawlController>,
    visited: Vec<String>,
}

impl WebCrawler for InterruptingCrawler {
    fn visit(&mut self, page: &Page) -> anyhow::Result<()> {
        self.visited.push(page.web_url.url.clone());
        self.controller.shutdown();
        Ok(())
    }
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_queued_urls() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");

    mount_page(
        &mock_server,
        "/",
        html(r#"<a href="/a">A</a><a href="/b">B</a>"#),
    )
    .await;
    mount_page(&mock_server, "/a", html("<p>A</p>")).await;
    mount_page(&mock_server, "/b", html("<p>B</p>")).await;

    let crawler = CrawlerConfig {
        batch_size: 1,
        ..CrawlerConfig::default()
    };
    let mut config = create_test_config(crawler, Some(db_path.to_string_lossy().to_string()));
    config.crawler.number_of_crawlers = 1;

    {
        let controller =
            std::sync::Arc::new(CrawlController::from_config(&config, false).unwrap());
        controller
            .add_seed(&format!("{}/", mock_server.uri()))
            .await
            .unwrap();

        let crawlers = controller
            .start(
                || InterruptingCrawler {
                    controller: std::sync::Arc::clone(&controller),
                    visited: Vec::new(),
                },
                1,
            )
            .await
            .unwrap();

        assert_eq!(crawlers[0].visited, vec![format!("{}/", mock_server.uri())]);
        assert_eq!(controller.frontier().queue_len(), 2);
    }

    // The seed is already known, but the links it produced are still owed a visit
    let (controller, resumed) = crawl(&mock_server, &config).await;

    let mut paths: Vec<&str> = resumed.keys().map(String::as_str).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["/a", "/b"]);
    assert!(controller.frontier().is_finished());

    let (_, third) = crawl(&mock_server, &config).await;
    assert!(third.is_empty());
}

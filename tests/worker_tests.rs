//! Integration tests for the crawl worker
//!
//! These tests use wiremock to serve tier-1 responses and a fake browser
//! fetcher standing in for tier 2.

use async_trait::async_trait;
use cask_crawler::classifier::ContentSignature;
use cask_crawler::crawler::{
    CrawlOutcome, CrawlWorker, FetchError, FetchedPage, HttpFetcher, TierFetcher, TierFetchers,
};
use cask_crawler::config::FetcherConfig;
use cask_crawler::escalation::EscalationReason;
use cask_crawler::frontier::{AddOptions, Frontier, SeenUrlStore};
use cask_crawler::history::{HistoryLookup, SqliteHistory};
use cask_crawler::store::{KvStore, MemoryStore};
use cask_crawler::{CookieSet, DomainCookieCache, FetchTier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE: &str = "retailers";

fn product_page(name: &str) -> String {
    format!(
        "<html><head><title>{name}</title></head><body><h1>{name}</h1>\
         <p>Non-chill filtered single malt, matured in first-fill bourbon casks. \
         Tasting notes: honey, orchard fruit, a wisp of peat smoke.</p></body></html>"
    )
}

/// Tier-2 stand-in that always returns the same page
struct FakeBrowser {
    body: String,
    calls: AtomicUsize,
}

impl FakeBrowser {
    fn new(body: String) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TierFetcher for FakeBrowser {
    fn tier(&self) -> FetchTier {
        FetchTier::Browser
    }

    async fn fetch(
        &self,
        url: &str,
        _cookies: Option<&CookieSet>,
    ) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedPage {
            final_url: url.to_string(),
            status_code: 200,
            body: self.body.clone(),
            set_cookies: CookieSet::new(),
        })
    }
}

struct Harness {
    frontier: Frontier,
    history: Arc<SqliteHistory>,
    cookies: DomainCookieCache,
}

impl Harness {
    fn new() -> Self {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let history = Arc::new(SqliteHistory::open_in_memory().unwrap());
        let seen = SeenUrlStore::new(store.clone(), history.clone(), "test");
        Self {
            frontier: Frontier::new(store.clone(), seen, "test"),
            history,
            cookies: DomainCookieCache::new(store, "test", Duration::from_secs(3600)),
        }
    }

    fn worker(&self, browser: Option<Arc<FakeBrowser>>) -> CrawlWorker {
        let config = FetcherConfig {
            timeout_secs: 5,
            connect_timeout_secs: 2,
            ..FetcherConfig::default()
        };

        let mut fetchers = TierFetchers::new();
        fetchers.register(Arc::new(HttpFetcher::new(&config).unwrap()));
        if let Some(browser) = browser {
            fetchers.register(browser);
        }

        CrawlWorker::new(
            self.frontier.clone(),
            self.history.clone(),
            self.cookies.clone(),
            fetchers,
        )
    }

    fn enqueue(&self, url: &str) {
        assert!(self
            .frontier
            .add_url(QUEUE, url, AddOptions::with_priority(5))
            .unwrap());
    }
}

#[tokio::test]
async fn test_crawl_accepts_and_discovers_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><head><title>Islay</title></head><body>
            <h1>Islay single malts, sorted by distillery and age statement</h1>
            <a href="/p/1">Ardbeg 10</a>
            <a href="{}/p/2">Lagavulin 16</a>
            <a href="https://elsewhere.example/p/3">Elsewhere</a>
            </body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    for (p, name) in [("/p/1", "Ardbeg 10"), ("/p/2", "Lagavulin 16")] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_page(name)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let harness = Harness::new();
    harness.enqueue(&format!("{}/", base_url));

    let summary = harness.worker(None).run(QUEUE, None).await.unwrap();
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.discovered, 2);

    let stats = harness.frontier.get_queue_stats(QUEUE).unwrap();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.added, 3);
    assert_eq!(stats.popped, 3);

    let url = format!("{}/p/1", base_url);
    assert!(harness.history.was_crawled(&url, &url).unwrap());
}

#[tokio::test]
async fn test_discovered_links_lower_priority() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>Highland single malt whisky list, page one of many, sorted by age</h1>
            <a href="/p/9">Clynelish 14</a></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    harness.enqueue(&format!("{}/list", mock_server.uri()));

    let (_, outcome) = harness
        .worker(None)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        outcome,
        CrawlOutcome::Accepted {
            tier: FetchTier::Http,
            status_code: 200,
            discovered: 1,
        }
    );

    let next = harness.frontier.peek_next_url(QUEUE).unwrap().unwrap();
    assert_eq!(next.priority, 4);
    assert_eq!(
        next.metadata["discovered_from"],
        format!("{}/list", mock_server.uri())
    );
}

#[tokio::test]
async fn test_blocking_status_escalates_to_browser() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    let url = format!("{}/blocked", mock_server.uri());
    harness.enqueue(&url);

    let browser = FakeBrowser::new(product_page("Springbank 15"));
    let worker = harness.worker(Some(browser.clone())).with_link_discovery(false);
    let (_, outcome) = worker.crawl_next(QUEUE).await.unwrap().unwrap();

    assert!(matches!(
        outcome,
        CrawlOutcome::Accepted {
            tier: FetchTier::Browser,
            status_code: 200,
            ..
        }
    ));
    assert_eq!(browser.calls(), 1);

    let stats = harness.history.load_domain_stats("127.0.0.1").unwrap();
    assert_eq!(stats.counter(FetchTier::Http).attempts, 1);
    assert_eq!(stats.counter(FetchTier::Http).successes, 0);
    assert_eq!(stats.counter(FetchTier::Browser).successes, 1);
}

#[tokio::test]
async fn test_challenge_without_higher_tier_is_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Just a moment...</title></head>\
             <body>Checking your browser before accessing the site.</body></html>",
        ))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    let url = format!("{}/challenge", mock_server.uri());
    harness.enqueue(&url);

    let (_, outcome) = harness
        .worker(None)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Exhausted {
            tier: FetchTier::Http,
            reason: Some(EscalationReason::Content(
                ContentSignature::CloudflareChallenge
            )),
        }
    );
    assert!(!harness.history.was_crawled(&url, &url).unwrap());
}

#[tokio::test]
async fn test_spa_shell_reports_placeholder_first() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/app"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<div id="root"></div>"#))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    harness.enqueue(&format!("{}/app", mock_server.uri()));

    let (_, outcome) = harness
        .worker(None)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Exhausted {
            tier: FetchTier::Http,
            reason: Some(EscalationReason::Content(
                ContentSignature::JavascriptPlaceholder
            )),
        }
    );
}

#[tokio::test]
async fn test_connection_error_moves_to_next_tier() {
    let harness = Harness::new();
    // Nothing listens on port 1
    harness.enqueue("http://127.0.0.1:1/unreachable");

    let browser = FakeBrowser::new(product_page("Redbreast 12"));
    let (_, outcome) = harness
        .worker(Some(browser.clone()))
        .with_link_discovery(false)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(browser.calls(), 1);
}

#[tokio::test]
async fn test_connection_error_without_fallback_fails() {
    let harness = Harness::new();
    harness.enqueue("http://127.0.0.1:1/unreachable");

    let (_, outcome) = harness
        .worker(None)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        outcome,
        CrawlOutcome::Failed {
            tier: Some(FetchTier::Http),
            ..
        }
    ));
}

#[tokio::test]
async fn test_low_success_rate_escalates_good_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Talisker 10")))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    for _ in 0..3 {
        harness
            .history
            .record_fetch_attempt("127.0.0.1", FetchTier::Http, false)
            .unwrap();
    }
    harness.enqueue(&format!("{}/p/1", mock_server.uri()));

    let browser = FakeBrowser::new(product_page("Talisker 10"));
    let (_, outcome) = harness
        .worker(Some(browser.clone()))
        .with_link_discovery(false)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        outcome,
        CrawlOutcome::Accepted {
            tier: FetchTier::Browser,
            ..
        }
    ));
    // The tier-1 page itself was fine, so it counts as a success
    let stats = harness.history.load_domain_stats("127.0.0.1").unwrap();
    assert_eq!(stats.counter(FetchTier::Http).attempts, 4);
    assert_eq!(stats.counter(FetchTier::Http).successes, 1);
}

#[tokio::test]
async fn test_low_success_rate_without_higher_tier_accepts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Oban 14")))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    harness
        .history
        .record_fetch_attempt("127.0.0.1", FetchTier::Http, false)
        .unwrap();
    harness.enqueue(&format!("{}/p/1", mock_server.uri()));

    let (_, outcome) = harness
        .worker(None)
        .crawl_next(QUEUE)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_accepted());
}

#[tokio::test]
async fn test_cookies_are_cached_and_replayed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/age-gate"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "age_verified=1; Path=/; Max-Age=86400")
                .set_body_string(product_page("Yamazaki 12")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .and(header("cookie", "age_verified=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Hibiki Harmony")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    harness.enqueue(&format!("{}/age-gate", mock_server.uri()));
    harness.enqueue(&format!("{}/p/2", mock_server.uri()));

    let summary = harness
        .worker(None)
        .with_link_discovery(false)
        .run(QUEUE, None)
        .await
        .unwrap();
    assert_eq!(summary.accepted, 2);

    let cookies = harness
        .cookies
        .get_domain_cookies("127.0.0.1")
        .unwrap()
        .unwrap();
    assert_eq!(cookies["age_verified"], "1");
}

#[tokio::test]
async fn test_run_respects_max_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Glenfarclas 105")))
        .mount(&mock_server)
        .await;

    let harness = Harness::new();
    for i in 0..5 {
        harness.enqueue(&format!("{}/p/{}", mock_server.uri(), i));
    }

    let summary = harness
        .worker(None)
        .with_link_discovery(false)
        .run(QUEUE, Some(2))
        .await
        .unwrap();
    assert_eq!(summary.pages, 2);
    assert_eq!(harness.frontier.get_queue_size(QUEUE).unwrap(), 3);
}

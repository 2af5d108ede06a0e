//! Tiered crawling
//!
//! This module contains the fetch side of the crawler:
//! - Tier fetchers and the tier-1 HTTP client
//! - Link discovery on accepted pages
//! - The crawl worker that drives escalation across tiers

mod fetcher;
mod parser;
mod worker;

pub use fetcher::{
    build_http_client, cookie_header, parse_set_cookies, FetchError, FetchErrorKind, FetchedPage,
    HttpFetcher, TierFetcher, TierFetchers,
};
pub use parser::{parse_html, same_domain_links, ParsedPage};
pub use worker::{CrawlOutcome, CrawlSummary, CrawlWorker};

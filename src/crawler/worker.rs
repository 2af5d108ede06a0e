//! Crawl worker
//!
//! Pops entries from one frontier queue and walks each one up the fetch tiers
//! until a tier returns usable content or the escalation policy runs out of
//! registered tiers.

use crate::classifier;
use crate::cookies::DomainCookieCache;
use crate::crawler::fetcher::{FetchedPage, TierFetchers};
use crate::crawler::parser::parse_html;
use crate::escalation::{should_escalate, DomainProfile, EscalationReason, FetchTier};
use crate::frontier::{AddOptions, Frontier, QueueEntry};
use crate::history::SqliteHistory;
use crate::state::DomainStats;
use crate::url::extract_domain;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// How one queue entry ended
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlOutcome {
    /// A tier returned usable content
    Accepted {
        tier: FetchTier,
        status_code: u16,
        /// Links admitted back into the queue
        discovered: usize,
    },

    /// The page still needed a higher tier but none was available
    Exhausted {
        tier: FetchTier,
        reason: Option<EscalationReason>,
    },

    /// No tier produced a usable page
    Failed {
        tier: Option<FetchTier>,
        error: String,
    },
}

impl CrawlOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Totals for one [`CrawlWorker::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages: usize,
    pub accepted: usize,
    pub exhausted: usize,
    pub failed: usize,
    pub discovered: usize,
}

impl CrawlSummary {
    fn record(&mut self, outcome: &CrawlOutcome) {
        self.pages += 1;
        match outcome {
            CrawlOutcome::Accepted { discovered, .. } => {
                self.accepted += 1;
                self.discovered += discovered;
            }
            CrawlOutcome::Exhausted { .. } => self.exhausted += 1,
            CrawlOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Fetches queued URLs through the tier ladder
pub struct CrawlWorker {
    frontier: Frontier,
    history: Arc<SqliteHistory>,
    cookies: DomainCookieCache,
    fetchers: TierFetchers,
    discover_links: bool,
}

impl CrawlWorker {
    pub fn new(
        frontier: Frontier,
        history: Arc<SqliteHistory>,
        cookies: DomainCookieCache,
        fetchers: TierFetchers,
    ) -> Self {
        Self {
            frontier,
            history,
            cookies,
            fetchers,
            discover_links: true,
        }
    }

    /// Enables or disables feeding same-domain links back into the queue
    pub fn with_link_discovery(mut self, enabled: bool) -> Self {
        self.discover_links = enabled;
        self
    }

    /// Crawls until the queue is empty or `max_pages` entries were processed
    pub async fn run(&self, queue_id: &str, max_pages: Option<usize>) -> Result<CrawlSummary> {
        info!(queue = %queue_id, tiers = ?self.fetchers.tiers(), "Starting crawl");

        let start_time = std::time::Instant::now();
        let mut summary = CrawlSummary::default();

        while max_pages.map_or(true, |max| summary.pages < max) {
            let Some((_, outcome)) = self.crawl_next(queue_id).await? else {
                info!(queue = %queue_id, "Queue is empty, crawl complete");
                break;
            };
            summary.record(&outcome);

            if summary.pages % 10 == 0 {
                let rate = summary.pages as f64 / start_time.elapsed().as_secs_f64();
                info!(
                    "Progress: {} pages, {} accepted, {} in queue, {:.2} pages/sec",
                    summary.pages,
                    summary.accepted,
                    self.frontier.get_queue_size(queue_id)?,
                    rate
                );
            }
        }

        info!(
            queue = %queue_id,
            pages = summary.pages,
            accepted = summary.accepted,
            exhausted = summary.exhausted,
            failed = summary.failed,
            discovered = summary.discovered,
            "Crawl finished"
        );
        Ok(summary)
    }

    /// Pops and crawls one entry; `None` if the queue was empty
    pub async fn crawl_next(&self, queue_id: &str) -> Result<Option<(QueueEntry, CrawlOutcome)>> {
        let Some(entry) = self.frontier.get_next_url(queue_id)? else {
            return Ok(None);
        };
        let outcome = self.crawl_entry(queue_id, &entry).await?;
        Ok(Some((entry, outcome)))
    }

    /// Fetches one entry, escalating through registered tiers as needed
    pub async fn crawl_entry(&self, queue_id: &str, entry: &QueueEntry) -> Result<CrawlOutcome> {
        let domain = match extract_domain(&entry.url) {
            Ok(domain) => domain,
            Err(e) => {
                warn!(url = %entry.url, error = %e, "Skipping unfetchable URL");
                return Ok(CrawlOutcome::Failed {
                    tier: None,
                    error: e.to_string(),
                });
            }
        };

        let mut stats = self.history.load_domain_stats(&domain)?;
        let mut tier = FetchTier::Http;

        loop {
            let Some(fetcher) = self.fetchers.get(tier) else {
                warn!(%tier, "No fetcher registered");
                return Ok(CrawlOutcome::Failed {
                    tier: Some(tier),
                    error: format!("no fetcher registered for {}", tier),
                });
            };

            let cookies = self.cookies.get_domain_cookies(&domain)?;
            debug!(url = %entry.url, %tier, "Fetching");

            let page = match fetcher.fetch(&entry.url, cookies.as_ref()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %entry.url, %tier, error = %e, "Fetch failed");
                    self.record_attempt(&domain, &mut stats, tier, false)?;

                    match tier.next().filter(|next| self.fetchers.has(*next)) {
                        Some(next) => {
                            tier = next;
                            continue;
                        }
                        None => {
                            return Ok(CrawlOutcome::Failed {
                                tier: Some(tier),
                                error: e.to_string(),
                            })
                        }
                    }
                }
            };

            if !page.set_cookies.is_empty() {
                let mut merged = cookies.unwrap_or_default();
                merged.extend(page.set_cookies.clone());
                self.cookies.set_domain_cookies(&domain, &merged, None)?;
            }

            let profile: &dyn DomainProfile = &stats;
            let decision = should_escalate(page.status_code, &page.body, Some(profile), tier);
            let content_ok = is_usable(&page);

            if decision.should_escalate {
                let page_was_fine = content_ok
                    && matches!(
                        decision.reason,
                        Some(EscalationReason::LowSuccessRate { .. })
                    );
                self.record_attempt(&domain, &mut stats, tier, page_was_fine)?;

                match decision
                    .recommended_tier
                    .filter(|next| self.fetchers.has(*next))
                {
                    Some(next) => {
                        info!(
                            url = %entry.url,
                            from = %tier,
                            to = %next,
                            reason = ?decision.reason.as_ref().map(|r| r.to_string()),
                            "Escalating"
                        );
                        tier = next;
                        continue;
                    }
                    None if page_was_fine => {
                        return self.accept(queue_id, entry, &domain, &page, tier);
                    }
                    None => {
                        return Ok(CrawlOutcome::Exhausted {
                            tier,
                            reason: decision.reason,
                        });
                    }
                }
            }

            self.record_attempt(&domain, &mut stats, tier, content_ok)?;

            if content_ok {
                return self.accept(queue_id, entry, &domain, &page, tier);
            }

            return Ok(match classifier::classify(&page.body) {
                Some(signature) if page.status_code == 200 => CrawlOutcome::Exhausted {
                    tier,
                    reason: Some(EscalationReason::Content(signature)),
                },
                _ => CrawlOutcome::Failed {
                    tier: Some(tier),
                    error: format!("HTTP {}", page.status_code),
                },
            });
        }
    }

    fn record_attempt(
        &self,
        domain: &str,
        stats: &mut DomainStats,
        tier: FetchTier,
        success: bool,
    ) -> Result<()> {
        stats.record_attempt(tier, success);
        self.history.record_fetch_attempt(domain, tier, success)?;
        Ok(())
    }

    fn accept(
        &self,
        queue_id: &str,
        entry: &QueueEntry,
        domain: &str,
        page: &FetchedPage,
        tier: FetchTier,
    ) -> Result<CrawlOutcome> {
        self.history
            .record_crawled(&entry.url, page.status_code, tier)?;

        let discovered = if self.discover_links {
            self.discover(queue_id, entry, domain, page)?
        } else {
            0
        };

        info!(url = %entry.url, %tier, discovered, "Accepted page");
        Ok(CrawlOutcome::Accepted {
            tier,
            status_code: page.status_code,
            discovered,
        })
    }

    fn discover(
        &self,
        queue_id: &str,
        entry: &QueueEntry,
        domain: &str,
        page: &FetchedPage,
    ) -> Result<usize> {
        let base_url = Url::parse(&page.final_url).or_else(|_| Url::parse(&entry.url))?;
        let parsed = parse_html(&page.body, &base_url);
        let priority = (entry.priority - 1).max(1);

        let mut added = 0;
        for link in parsed
            .links
            .iter()
            .filter(|link| extract_domain(link).is_ok_and(|d| d == domain))
        {
            let mut options =
                AddOptions::with_priority(priority).meta("discovered_from", entry.url.as_str());
            options.source_id = entry.source_id.clone();

            if self.frontier.add_url(queue_id, link, options)? {
                added += 1;
            }
        }

        if added > 0 {
            debug!(url = %entry.url, added, title = ?parsed.title, "Queued discovered links");
        }
        Ok(added)
    }
}

/// A 2xx page whose body matches no "not real content" signature
fn is_usable(page: &FetchedPage) -> bool {
    (200..300).contains(&page.status_code) && classifier::classify(&page.body).is_none()
}

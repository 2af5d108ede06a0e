//! Cask Crawler main entry point
//!
//! Command-line interface for the crawl frontier and tiered fetcher.

use anyhow::Context;
use cask_crawler::classifier::classify_all;
use cask_crawler::config::{load_config_with_hash, require_persistent_store, Config};
use cask_crawler::crawler::{CrawlWorker, HttpFetcher, TierFetchers};
use cask_crawler::escalation::{should_escalate, FetchTier};
use cask_crawler::frontier::{AddOptions, Frontier, SeenUrlStore};
use cask_crawler::history::SqliteHistory;
use cask_crawler::store::open_store;
use cask_crawler::DomainCookieCache;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Cask Crawler: priority crawl frontier with tiered fetch escalation
///
/// Queues product URLs with persistent deduplication, fetches them through a
/// lightweight HTTP client and reports when a page needs a more capable
/// fetching tier.
#[derive(Parser, Debug)]
#[command(name = "cask-crawler")]
#[command(version)]
#[command(about = "Crawl frontier and tiered-fetch escalation engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "crawler.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Store(StoreCommand),

    /// Run the classifiers and escalation policy over a saved page
    Classify {
        file: PathBuf,

        #[arg(long, default_value_t = 200)]
        status: u16,

        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
        tier: u8,
    },
}

/// Commands that operate on the configured store and history
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Admit URLs into a queue
    Enqueue {
        queue: String,

        #[arg(required = true)]
        urls: Vec<String>,

        /// 1 (lowest) to 10 (highest)
        #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(i32).range(1..=10))]
        priority: i32,

        /// Originating crawl source
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Crawl a queue until it is empty
    Crawl {
        queue: String,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Show queue and history statistics
    Stats { queue: String },

    /// Clear a queue and/or its seen set
    Reset {
        queue: String,

        #[arg(long, conflicts_with = "seen_only")]
        queue_only: bool,

        #[arg(long)]
        seen_only: bool,
    },

    /// Show or delete cached cookies for a domain
    Cookies {
        domain: String,

        #[arg(long)]
        delete: bool,
    },
}

/// Everything a command needs, opened once from the configuration
struct Services {
    history: Arc<SqliteHistory>,
    frontier: Frontier,
    cookies: DomainCookieCache,
}

impl Services {
    fn open(config: &Config) -> anyhow::Result<Self> {
        let store = open_store(&config.store).context("Failed to open backing store")?;
        let history = Arc::new(
            SqliteHistory::open(Path::new(&config.store.history_path))
                .context("Failed to open crawl history")?,
        );

        let prefix = config.store.key_prefix.clone();
        let seen = SeenUrlStore::new(store.clone(), history.clone(), prefix.clone());
        let frontier = Frontier::new(store.clone(), seen, prefix.clone());
        let cookies = DomainCookieCache::new(
            store.clone(),
            prefix,
            Duration::from_secs(config.cookies.default_ttl_secs),
        );

        Ok(Self {
            history,
            frontier,
            cookies,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Classify { file, status, tier } => handle_classify(&file, status, tier),
        Command::Store(command) => run_store_command(&cli.config, command).await,
    }
}

async fn run_store_command(config_path: &Path, command: StoreCommand) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, hash) = load_config_with_hash(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", hash);
    require_persistent_store(&config)?;

    let services = Services::open(&config)?;

    match command {
        StoreCommand::Enqueue {
            queue,
            urls,
            priority,
            source,
        } => handle_enqueue(&services, &queue, &urls, priority, source),
        StoreCommand::Crawl { queue, max_pages } => {
            handle_crawl(&config, services, &queue, max_pages).await
        }
        StoreCommand::Stats { queue } => handle_stats(&services, &queue),
        StoreCommand::Reset {
            queue,
            queue_only,
            seen_only,
        } => handle_reset(&services, &queue, queue_only, seen_only),
        StoreCommand::Cookies { domain, delete } => handle_cookies(&services, &domain, delete),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cask_crawler=info,warn"),
            1 => EnvFilter::new("cask_crawler=debug,info"),
            2 => EnvFilter::new("cask_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn handle_enqueue(
    services: &Services,
    queue: &str,
    urls: &[String],
    priority: i32,
    source: Option<String>,
) -> anyhow::Result<()> {
    let mut added = 0;
    for url in urls {
        let mut options = AddOptions::with_priority(priority);
        options.source_id = source.clone();

        if services.frontier.add_url(queue, url, options)? {
            added += 1;
        } else {
            println!("  skipped (already seen): {}", url);
        }
    }

    println!("✓ Queued {} of {} URLs in '{}'", added, urls.len(), queue);
    Ok(())
}

async fn handle_crawl(
    config: &Config,
    services: Services,
    queue: &str,
    max_pages: Option<usize>,
) -> anyhow::Result<()> {
    let mut fetchers = TierFetchers::new();
    fetchers.register(Arc::new(
        HttpFetcher::new(&config.fetcher).context("Failed to build HTTP client")?,
    ));

    let worker = CrawlWorker::new(
        services.frontier,
        services.history,
        services.cookies,
        fetchers,
    )
    .with_link_discovery(config.worker.discover_links);

    let summary = worker
        .run(queue, max_pages.or(config.worker.max_pages))
        .await?;

    println!("=== Crawl Summary ===\n");
    println!("  Pages:      {}", summary.pages);
    println!("  Accepted:   {}", summary.accepted);
    println!("  Exhausted:  {}", summary.exhausted);
    println!("  Failed:     {}", summary.failed);
    println!("  Discovered: {}", summary.discovered);
    Ok(())
}

fn handle_stats(services: &Services, queue: &str) -> anyhow::Result<()> {
    let stats = services.frontier.get_queue_stats(queue)?;
    let global_seen = services.frontier.seen().get_global_seen_count()?;
    let history = services.history.counts()?;

    println!("=== Queue '{}' ===\n", queue);
    println!("  Queued:       {}", stats.size);
    println!("  Seen (queue): {}", stats.seen);
    println!("  Seen (all):   {}", global_seen);
    println!("  Added:        {}", stats.added);
    println!("  Popped:       {}", stats.popped);

    if let Some(next) = services.frontier.peek_next_url(queue)? {
        println!("  Next:         {} (priority {})", next.url, next.priority);
    }

    println!("\n=== History ===\n");
    println!("  Crawled URLs:     {}", history.crawled_urls);
    println!("  Discovered items: {}", history.discovered_items);
    println!("  Domains:          {}", history.domains);
    Ok(())
}

fn handle_reset(
    services: &Services,
    queue: &str,
    queue_only: bool,
    seen_only: bool,
) -> anyhow::Result<()> {
    if queue_only {
        services.frontier.clear_queue(queue)?;
        println!("✓ Cleared queue '{}'", queue);
    } else if seen_only {
        services.frontier.clear_seen(queue)?;
        println!("✓ Cleared seen set for '{}'", queue);
    } else {
        services.frontier.reset_queue(queue)?;
        println!("✓ Reset '{}'", queue);
    }
    Ok(())
}

fn handle_classify(file: &Path, status: u16, tier: u8) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let tier = FetchTier::from_number(tier)
        .with_context(|| format!("Invalid tier {}", tier))?;

    let signatures = classify_all(&content);
    let decision = should_escalate(status, &content, None, tier);

    println!("File: {} ({} bytes)", file.display(), content.len());
    if signatures.is_empty() {
        println!("Signatures: none");
    } else {
        for signature in &signatures {
            println!("Signature: {}", signature);
        }
    }

    if decision.should_escalate {
        println!(
            "Decision: escalate to {}",
            decision
                .recommended_tier
                .map(|t| t.to_string())
                .unwrap_or_default()
        );
    } else {
        println!("Decision: stay at {}", tier);
    }
    if let Some(reason) = decision.reason {
        println!("Reason: {}", reason);
    }
    Ok(())
}

fn handle_cookies(services: &Services, domain: &str, delete: bool) -> anyhow::Result<()> {
    if delete {
        if services.cookies.delete_domain_cookies(domain)? {
            println!("✓ Deleted cookies for {}", domain);
        } else {
            println!("No cookies cached for {}", domain);
        }
        return Ok(());
    }

    match services.cookies.get_domain_cookies(domain)? {
        Some(cookies) => {
            for (name, value) in &cookies {
                println!("{}={}", name, value);
            }
        }
        None => println!("No cookies cached for {}", domain),
    }
    Ok(())
}

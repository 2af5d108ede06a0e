//! State module for per-domain fetch performance
//!
//! `DomainStats` counts attempts and successes for each fetch tier. It is
//! the concrete domain profile the escalation policy consults, persisted by
//! the crawl history store between runs.

mod domain_stats;

pub use domain_stats::{DomainStats, TierCounter};

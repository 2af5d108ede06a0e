use crate::escalation::{DomainProfile, FetchTier};
use chrono::{DateTime, Utc};

/// Attempt/success counters for one fetch tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounter {
    pub attempts: u64,
    pub successes: u64,
}

impl TierCounter {
    /// Fraction of successful attempts, or `None` before the first attempt
    pub fn success_rate(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.successes as f64 / self.attempts as f64)
        }
    }
}

/// Tracks how well each fetch tier performs against one domain
///
/// The crawl worker records every attempt; the escalation policy reads the
/// resulting success rates through [`DomainProfile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainStats {
    /// Counters indexed by tier number - 1
    pub tiers: [TierCounter; 3],

    /// When an attempt was last recorded
    pub updated_at: Option<DateTime<Utc>>,
}

impl DomainStats {
    /// Creates empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for one tier
    pub fn counter(&self, tier: FetchTier) -> TierCounter {
        self.tiers[usize::from(tier.number() - 1)]
    }

    /// Records one fetch attempt at `tier`
    pub fn record_attempt(&mut self, tier: FetchTier, success: bool) {
        let counter = &mut self.tiers[usize::from(tier.number() - 1)];
        counter.attempts += 1;
        if success {
            counter.successes += 1;
        }
        self.updated_at = Some(Utc::now());
    }

    /// Total attempts across all tiers
    pub fn total_attempts(&self) -> u64 {
        self.tiers.iter().map(|c| c.attempts).sum()
    }
}

impl DomainProfile for DomainStats {
    fn success_rate(&self, tier: FetchTier) -> Option<f64> {
        self.counter(tier).success_rate()
    }
}

use crate::escalation::tier::FetchTier;
use serde::{Deserialize, Serialize};

/// Per-domain historical success rates, one per fetch tier
///
/// Rates are fractions in `[0, 1]`. A tier with no recorded data returns
/// `None` and is treated as fully successful.
pub trait DomainProfile {
    fn success_rate(&self, tier: FetchTier) -> Option<f64>;
}

/// Plain record of the three per-tier success rates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSuccessRates {
    pub tier1: Option<f64>,
    pub tier2: Option<f64>,
    pub tier3: Option<f64>,
}

impl DomainProfile for TierSuccessRates {
    fn success_rate(&self, tier: FetchTier) -> Option<f64> {
        match tier {
            FetchTier::Http => self.tier1,
            FetchTier::Browser => self.tier2,
            FetchTier::CloudBrowser => self.tier3,
        }
    }
}

/// Reads a tier's success rate, defaulting to 100% when absent or malformed
pub fn effective_success_rate(profile: &dyn DomainProfile, tier: FetchTier) -> f64 {
    match profile.success_rate(tier) {
        Some(rate) if rate.is_finite() => rate.clamp(0.0, 1.0),
        _ => 1.0,
    }
}

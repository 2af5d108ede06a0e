//! Tiered-fetch escalation
//!
//! Given the outcome of a fetch, the domain's historical performance and the
//! tier that produced it, decide whether the page has to be fetched again
//! through the next, more capable tier.

mod policy;
mod profile;
mod tier;

pub use policy::{
    should_escalate, EscalationReason, EscalationResult, BLOCKING_STATUS_CODES,
    SUCCESS_RATE_THRESHOLD,
};
pub use profile::{effective_success_rate, DomainProfile, TierSuccessRates};
pub use tier::FetchTier;

use crate::classifier::ContentSignature;
use crate::escalation::profile::{effective_success_rate, DomainProfile};
use crate::escalation::tier::FetchTier;
use std::fmt;

/// Status codes that mean the current tier is being blocked or throttled
pub const BLOCKING_STATUS_CODES: [u16; 3] = [403, 429, 503];

/// Tiers whose historical success rate is strictly below this are escalated
pub const SUCCESS_RATE_THRESHOLD: f64 = 0.50;

/// Why a fetch should be retried through a higher tier
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationReason {
    /// The server answered with a blocking or rate-limit status
    BlockingStatus(u16),

    /// The body matched a "not real content" signature
    Content(ContentSignature),

    /// The domain historically fails at the current tier
    LowSuccessRate { tier: FetchTier, rate: f64 },
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockingStatus(code) => {
                write!(f, "HTTP {} indicates blocking or rate limiting", code)
            }
            Self::Content(ContentSignature::CloudflareChallenge) => {
                write!(f, "Cloudflare challenge page detected")
            }
            Self::Content(ContentSignature::Captcha) => write!(f, "CAPTCHA detected on page"),
            Self::Content(ContentSignature::JavascriptPlaceholder) => {
                write!(f, "JavaScript placeholder detected, page requires rendering")
            }
            Self::Content(ContentSignature::EmptyOrLoading) => {
                write!(f, "Page is empty or still loading")
            }
            Self::LowSuccessRate { tier, rate } => write!(
                f,
                "Tier {} success rate for domain is {:.1}%, below {:.0}% threshold",
                tier.number(),
                rate * 100.0,
                SUCCESS_RATE_THRESHOLD * 100.0
            ),
        }
    }
}

/// Outcome of one escalation decision
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationResult {
    pub should_escalate: bool,
    pub reason: Option<EscalationReason>,
    pub recommended_tier: Option<FetchTier>,
}

impl EscalationResult {
    /// Keep the result from the current tier
    pub fn stay() -> Self {
        Self {
            should_escalate: false,
            reason: None,
            recommended_tier: None,
        }
    }

    fn escalate(current: FetchTier, reason: EscalationReason) -> Self {
        match current.next() {
            Some(next) => Self {
                should_escalate: true,
                reason: Some(reason),
                recommended_tier: Some(next),
            },
            None => Self::stay(),
        }
    }
}

/// Decides whether a fetch must be retried through the next tier
///
/// Checks run in a fixed order and the first match wins:
///
/// 1. At the highest tier nothing escalates.
/// 2. A status in [`BLOCKING_STATUS_CODES`] escalates.
/// 3. On HTTP 200 the body is classified: challenge, CAPTCHA, JavaScript
///    placeholder, then empty/loading.
/// 4. Otherwise the domain's success rate at the current tier is compared
///    against [`SUCCESS_RATE_THRESHOLD`]; missing data counts as 100%.
///
/// The function does no I/O. Callers re-fetch through
/// `recommended_tier` and feed the outcome back into the domain statistics.
///
/// # Examples
///
/// ```
/// use cask_crawler::escalation::{should_escalate, FetchTier};
///
/// let decision = should_escalate(403, "", None, FetchTier::Http);
/// assert!(decision.should_escalate);
/// assert_eq!(decision.recommended_tier, Some(FetchTier::Browser));
///
/// let decision = should_escalate(403, "", None, FetchTier::CloudBrowser);
/// assert!(!decision.should_escalate);
/// ```
pub fn should_escalate(
    status_code: u16,
    content: &str,
    domain_profile: Option<&dyn DomainProfile>,
    current_tier: FetchTier,
) -> EscalationResult {
    if current_tier.is_highest() {
        return EscalationResult::stay();
    }

    if BLOCKING_STATUS_CODES.contains(&status_code) {
        return EscalationResult::escalate(
            current_tier,
            EscalationReason::BlockingStatus(status_code),
        );
    }

    if status_code == 200 {
        if let Some(signature) = crate::classifier::classify(content) {
            return EscalationResult::escalate(current_tier, EscalationReason::Content(signature));
        }
    }

    if let Some(profile) = domain_profile {
        let rate = effective_success_rate(profile, current_tier);
        if rate < SUCCESS_RATE_THRESHOLD {
            return EscalationResult::escalate(
                current_tier,
                EscalationReason::LowSuccessRate {
                    tier: current_tier,
                    rate,
                },
            );
        }
    }

    EscalationResult::stay()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::profile::TierSuccessRates;

    fn real_page() -> String {
        format!(
            "<html><body><h1>Glen Example 18</h1><p>{}</p></body></html>",
            "Aged eighteen years in a mix of bourbon and sherry casks. ".repeat(8)
        )
    }

    fn rates(tier1: f64) -> TierSuccessRates {
        TierSuccessRates {
            tier1: Some(tier1),
            tier2: Some(0.9),
            tier3: Some(0.95),
        }
    }

    #[test]
    fn test_blocking_statuses_escalate() {
        for code in BLOCKING_STATUS_CODES {
            let result = should_escalate(code, &real_page(), None, FetchTier::Http);
            assert!(result.should_escalate, "status {} should escalate", code);
            assert_eq!(result.recommended_tier, Some(FetchTier::Browser));
            assert_eq!(result.reason, Some(EscalationReason::BlockingStatus(code)));
        }
    }

    #[test]
    fn test_403_reason_names_status() {
        let result = should_escalate(403, "anything", None, FetchTier::Http);
        assert!(result.reason.unwrap().to_string().contains("403"));
    }

    #[test]
    fn test_tier_two_escalates_to_three() {
        let result = should_escalate(429, "", None, FetchTier::Browser);
        assert_eq!(result.recommended_tier, Some(FetchTier::CloudBrowser));
    }

    #[test]
    fn test_highest_tier_never_escalates() {
        let low = rates(0.0);
        let profile = TierSuccessRates {
            tier3: Some(0.0),
            ..low
        };
        for (code, body) in [
            (403, real_page()),
            (200, "<title>Just a moment...</title>".to_string()),
            (200, r#"<div id="root"></div>"#.to_string()),
            (500, real_page()),
        ] {
            let result = should_escalate(code, &body, Some(&profile), FetchTier::CloudBrowser);
            assert_eq!(result, EscalationResult::stay());
        }
    }

    #[test]
    fn test_content_checks_in_fixed_order() {
        let challenge = "<title>Just a moment...</title><div class=\"g-recaptcha\"></div>";
        let result = should_escalate(200, challenge, None, FetchTier::Http);
        assert_eq!(
            result.reason,
            Some(EscalationReason::Content(ContentSignature::CloudflareChallenge))
        );

        let captcha = r#"<div class="h-captcha"></div>"#;
        let result = should_escalate(200, captcha, None, FetchTier::Http);
        assert_eq!(
            result.reason,
            Some(EscalationReason::Content(ContentSignature::Captcha))
        );

        let shell = r#"<div id="root"></div>"#;
        let result = should_escalate(200, shell, None, FetchTier::Http);
        assert_eq!(
            result.reason,
            Some(EscalationReason::Content(ContentSignature::JavascriptPlaceholder))
        );

        let empty = "<html><body><p>Soon</p></body></html>";
        let result = should_escalate(200, empty, None, FetchTier::Http);
        assert_eq!(
            result.reason,
            Some(EscalationReason::Content(ContentSignature::EmptyOrLoading))
        );
    }

    #[test]
    fn test_content_checks_only_on_200() {
        let result = should_escalate(404, r#"<div id="root"></div>"#, None, FetchTier::Http);
        assert!(!result.should_escalate);
    }

    #[test]
    fn test_low_success_rate_escalates() {
        let profile = rates(0.3);
        let result = should_escalate(200, &real_page(), Some(&profile), FetchTier::Http);
        assert!(result.should_escalate);
        assert_eq!(result.recommended_tier, Some(FetchTier::Browser));
        let reason = result.reason.unwrap().to_string();
        assert!(reason.contains("30.0%"), "reason was: {}", reason);
    }

    #[test]
    fn test_success_rate_threshold_is_strict() {
        let profile = rates(0.5);
        let result = should_escalate(200, &real_page(), Some(&profile), FetchTier::Http);
        assert!(!result.should_escalate);

        let profile = rates(0.4999);
        let result = should_escalate(200, &real_page(), Some(&profile), FetchTier::Http);
        assert!(result.should_escalate);
    }

    #[test]
    fn test_success_rate_applies_to_non_200() {
        let profile = rates(0.1);
        let result = should_escalate(500, "", Some(&profile), FetchTier::Http);
        assert!(matches!(
            result.reason,
            Some(EscalationReason::LowSuccessRate {
                tier: FetchTier::Http,
                ..
            })
        ));
    }

    #[test]
    fn test_uses_current_tier_rate() {
        let profile = TierSuccessRates {
            tier1: Some(0.1),
            tier2: Some(0.8),
            tier3: None,
        };
        let result = should_escalate(200, &real_page(), Some(&profile), FetchTier::Browser);
        assert!(!result.should_escalate);
    }

    #[test]
    fn test_missing_rate_does_not_escalate() {
        let profile = TierSuccessRates::default();
        let result = should_escalate(200, &real_page(), Some(&profile), FetchTier::Http);
        assert_eq!(result, EscalationResult::stay());
    }

    #[test]
    fn test_good_page_does_not_escalate() {
        let result = should_escalate(200, &real_page(), Some(&rates(0.9)), FetchTier::Http);
        assert!(!result.should_escalate);
        assert!(result.reason.is_none());
        assert!(result.recommended_tier.is_none());
    }
}

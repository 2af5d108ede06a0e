use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three fetch strategies, each more capable and more costly
///
/// Tiers are numbered from 1. The only valid escalation target is the next
/// tier; there is nothing above [`FetchTier::CloudBrowser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FetchTier {
    /// Lightweight HTTP client
    Http = 1,

    /// JavaScript-rendering browser automation
    Browser = 2,

    /// Managed cloud browser with IP rotation and bot bypass
    CloudBrowser = 3,
}

impl FetchTier {
    /// All tiers, cheapest first
    pub const ALL: [FetchTier; 3] = [Self::Http, Self::Browser, Self::CloudBrowser];

    /// The 1-based tier number
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Looks up a tier by its 1-based number
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Http),
            2 => Some(Self::Browser),
            3 => Some(Self::CloudBrowser),
            _ => None,
        }
    }

    /// The tier to escalate to, or `None` at the top tier
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// Returns true if there is no tier to escalate to
    pub fn is_highest(self) -> bool {
        self.next().is_none()
    }
}

impl From<FetchTier> for u8 {
    fn from(tier: FetchTier) -> Self {
        tier.number()
    }
}

impl TryFrom<u8> for FetchTier {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::from_number(number).ok_or_else(|| format!("invalid fetch tier: {}", number))
    }
}

impl fmt::Display for FetchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(FetchTier::Http.number(), 1);
        assert_eq!(FetchTier::Browser.number(), 2);
        assert_eq!(FetchTier::CloudBrowser.number(), 3);
    }

    #[test]
    fn test_from_number() {
        assert_eq!(FetchTier::from_number(2), Some(FetchTier::Browser));
        assert_eq!(FetchTier::from_number(0), None);
        assert_eq!(FetchTier::from_number(4), None);
    }

    #[test]
    fn test_next_never_skips() {
        assert_eq!(FetchTier::Http.next(), Some(FetchTier::Browser));
        assert_eq!(FetchTier::Browser.next(), Some(FetchTier::CloudBrowser));
        assert_eq!(FetchTier::CloudBrowser.next(), None);
        assert!(FetchTier::CloudBrowser.is_highest());
    }

    #[test]
    fn test_ordering() {
        assert!(FetchTier::Http < FetchTier::Browser);
        assert!(FetchTier::Browser < FetchTier::CloudBrowser);
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&FetchTier::Browser).unwrap(), "2");
        let tier: FetchTier = serde_json::from_str("3").unwrap();
        assert_eq!(tier, FetchTier::CloudBrowser);
        assert!(serde_json::from_str::<FetchTier>("4").is_err());
    }
}

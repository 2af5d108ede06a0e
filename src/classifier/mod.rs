//! Content classifier for fetched pages
//!
//! Cheap, deterministic checks that recognise responses which carry no real
//! product content even though the server answered:
//! - Cloudflare-style browser challenges
//! - CAPTCHA walls
//! - Client-side rendered shells (empty SPA mount points)
//! - Empty or still-loading pages
//!
//! All string matching is case-insensitive. The functions are pure and safe
//! to call from any number of threads.

mod checks;
mod markers;
mod text;

pub use checks::{
    is_captcha_page, is_cloudflare_challenge, is_empty_or_loading, is_javascript_placeholder,
};
pub use text::visible_text;

use std::fmt;

/// A recognised "not real content" signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentSignature {
    CloudflareChallenge,
    Captcha,
    JavascriptPlaceholder,
    EmptyOrLoading,
}

impl ContentSignature {
    /// All signatures in the order they are checked
    pub const ALL: [ContentSignature; 4] = [
        Self::CloudflareChallenge,
        Self::Captcha,
        Self::JavascriptPlaceholder,
        Self::EmptyOrLoading,
    ];

    /// Runs the check for this signature
    pub fn matches(&self, content: &str) -> bool {
        match self {
            Self::CloudflareChallenge => is_cloudflare_challenge(content),
            Self::Captcha => is_captcha_page(content),
            Self::JavascriptPlaceholder => is_javascript_placeholder(content),
            Self::EmptyOrLoading => is_empty_or_loading(content),
        }
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CloudflareChallenge => "cloudflare challenge",
            Self::Captcha => "captcha",
            Self::JavascriptPlaceholder => "javascript placeholder",
            Self::EmptyOrLoading => "empty or loading",
        };
        write!(f, "{}", name)
    }
}

/// Returns the first matching signature, checking in a fixed order
///
/// Several checks can match the same page (an empty SPA shell is both a
/// JavaScript placeholder and an empty page); the first one in
/// [`ContentSignature::ALL`] order wins.
pub fn classify(content: &str) -> Option<ContentSignature> {
    ContentSignature::ALL
        .into_iter()
        .find(|signature| signature.matches(content))
}

/// Returns every matching signature, in check order
pub fn classify_all(content: &str) -> Vec<ContentSignature> {
    ContentSignature::ALL
        .into_iter()
        .filter(|signature| signature.matches(content))
        .collect()
}

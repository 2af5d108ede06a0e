//! Marker tables for the content classifier
//!
//! All markers are lower-case; they are matched against the lower-cased body.

/// Pages at or above this size are never treated as challenge pages
pub const CHALLENGE_MAX_BYTES: usize = 50_000;

/// Low-confidence challenge markers only count on pages below this size
pub const SPARSE_CHALLENGE_MAX_BYTES: usize = 10_000;

/// Low-confidence challenge markers only count when visible text is this short
pub const SPARSE_CHALLENGE_MAX_TEXT: usize = 1_000;

/// Visible text after an SPA mount point shorter than this means it is empty
pub const MOUNT_POINT_MAX_TEXT: usize = 100;

/// How much of the body after an SPA mount point is inspected
pub const MOUNT_POINT_WINDOW_BYTES: usize = 500;

/// Visible text shorter than this marks a loading page when a loader is present
pub const LOADING_MAX_TEXT: usize = 200;

/// Visible text shorter than this marks the page as empty unconditionally
pub const EMPTY_MAX_TEXT: usize = 50;

/// Phrases and script tokens that only appear on challenge interstitials
pub const CHALLENGE_STRONG_MARKERS: &[&str] = &[
    "checking your browser",
    "just a moment...",
    "cf-browser-verification",
    "cf_chl_opt",
    "cf-challenge-running",
    "/cdn-cgi/challenge-platform/",
    "enable javascript and cookies to continue",
];

/// Markers that also appear in ordinary page footers and error pages
pub const CHALLENGE_WEAK_MARKERS: &[&str] = &[
    "cloudflare ray id",
    "cf-ray",
    "ddos protection by cloudflare",
    "attention required",
    "cloudflare",
];

/// CAPTCHA widget classes, response fields and sitekey attributes
pub const CAPTCHA_MARKERS: &[&str] = &[
    "g-recaptcha",
    "g-recaptcha-response",
    "h-captcha",
    "h-captcha-response",
    "cf-turnstile",
    "data-sitekey",
    "captcha-container",
    "px-captcha",
    "geo.captcha-delivery.com",
    "funcaptcha",
];

/// SPA mount points; the text after the opening tag is checked for emptiness
pub const MOUNT_POINT_PATTERNS: &[&str] = &[
    r#"(?i)<div[^>]*\bid\s*=\s*["'](?:root|app|__next|__nuxt|___gatsby)["'][^>]*>"#,
    r#"(?i)<app-root[^>]*>"#,
    r#"(?i)<div[^>]*\bdata-reactroot\b[^>]*>"#,
];

/// Messages shown to clients that do not run JavaScript
pub const NOSCRIPT_MESSAGES: &[&str] = &[
    "you need to enable javascript to run this app",
    "please enable javascript",
    "javascript is required",
    "javascript is disabled in your browser",
    "this site requires javascript",
];

/// Loading indicators left in the markup of a shell page
pub const LOADING_MARKERS: &[&str] = &[
    "loading...",
    "loading\u{2026}",
    "please wait",
    "class=\"loading",
    "class=\"loader",
    "class=\"spinner",
    "aria-busy=\"true\"",
];

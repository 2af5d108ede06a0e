//! URL handling module
//!
//! This module provides deduplication normalization, URL digests, and domain
//! extraction used to key per-domain caches and statistics.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, normalize_domain_key};
pub use normalize::{normalize_for_dedup, url_hash};

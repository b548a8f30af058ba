//! Page auditors: classic technical SEO and LLMO (AI-citability).
//!
//! Both operate on already-fetched HTML so the crawler can share one fetch
//! per page between them.

pub mod llmo;
pub mod seo;

/// Message recorded on a page audit when the fetch failed or timed out.
pub const UNREACHABLE_MESSAGE: &str = "Page could not be fetched (network failure or timeout)";

//! Search-console cross-referencing.
//!
//! Matches audited URLs against externally-synced performance rows by URL
//! path. Protocol, host, query string and trailing slash differences must
//! not break the match.

use url::Url;

use crate::domain::models::{GscPageData, GscPageRow};

/// Reduce a URL (or bare path) to its comparable path: query and fragment
/// dropped, trailing slash trimmed. The root path collapses to "".
pub fn normalize_path(raw: &str) -> String {
    let path = match Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        // Not an absolute URL: treat as a raw path.
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.trim_end_matches('/').to_string()
}

/// Find the performance row for an audited URL. Attaches only when exactly
/// one row shares the normalized path; ambiguous matches attach nothing.
pub fn match_page(url: &str, rows: &[GscPageRow]) -> Option<GscPageData> {
    let path = normalize_path(url);
    let mut matches = rows.iter().filter(|row| normalize_path(&row.page) == path);
    let row = matches.next()?;
    if matches.next().is_some() {
        tracing::debug!("[GSC] Ambiguous path match for {}, skipping", url);
        return None;
    }
    Some(GscPageData {
        impressions: row.impressions,
        clicks: row.clicks,
        position: row.position,
        ctr: ctr_percent(row.clicks, row.impressions),
    })
}

/// clicks/impressions as a percentage, rounded to 1 decimal. Zero when
/// there are no impressions.
pub fn ctr_percent(clicks: i64, impressions: i64) -> f64 {
    if impressions <= 0 {
        return 0.0;
    }
    round1(clicks as f64 / impressions as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

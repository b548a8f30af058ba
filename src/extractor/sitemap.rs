//! Sitemap discovery and XML extraction.
//!
//! Probes the conventional sitemap locations, resolves sitemap-index files
//! into page URLs, and caps the result for downstream auditing. A candidate
//! that fails to fetch or parse is skipped, never fatal.

use quick_xml::events::Event;

use crate::service::http::FetchText;

/// Hard cap on page URLs returned by discovery.
pub const MAX_SITEMAP_URLS: usize = 50;

/// Sub-sitemaps resolved from an index file, in order of appearance.
pub const MAX_SUB_SITEMAPS: usize = 5;

/// Candidate locations, probed in order.
const CANDIDATE_PATHS: [&str; 3] = ["/sitemap.xml", "/sitemap_index.xml", "/sitemap/"];

#[derive(Debug, Default)]
pub struct SitemapDiscovery {
    /// Page URLs, at most [`MAX_SITEMAP_URLS`].
    pub urls: Vec<String>,
    /// The candidate that yielded the URLs, if any.
    pub sitemap_url: Option<String>,
}

/// `<loc>` entries of one sitemap document, split by container element.
#[derive(Debug, Default)]
struct SitemapDoc {
    /// `<sitemapindex><sitemap><loc>` entries.
    sub_sitemaps: Vec<String>,
    /// `<urlset><url><loc>` entries.
    pages: Vec<String>,
}

/// Discover page URLs for a site. `base_url` may carry a trailing slash.
pub async fn discover(fetcher: &dyn FetchText, base_url: &str) -> SitemapDiscovery {
    let base = base_url.trim_end_matches('/');

    for path in CANDIDATE_PATHS {
        let candidate = format!("{base}{path}");
        let Some(body) = fetcher.fetch_text(&candidate).await else {
            tracing::debug!("[SITEMAP] Candidate unavailable: {}", candidate);
            continue;
        };

        let doc = parse_sitemap(&body);
        let mut urls = if !doc.pages.is_empty() {
            doc.pages
        } else if !doc.sub_sitemaps.is_empty() {
            tracing::debug!(
                "[SITEMAP] {} is an index with {} sub-sitemaps",
                candidate,
                doc.sub_sitemaps.len()
            );
            resolve_index(fetcher, &doc.sub_sitemaps).await
        } else {
            Vec::new()
        };

        if !urls.is_empty() {
            urls.truncate(MAX_SITEMAP_URLS);
            tracing::info!("[SITEMAP] Found {} URLs via {}", urls.len(), candidate);
            return SitemapDiscovery {
                urls,
                sitemap_url: Some(candidate),
            };
        }
    }

    tracing::info!("[SITEMAP] No usable sitemap for {}", base);
    SitemapDiscovery::default()
}

/// Fetch sub-sitemaps sequentially, stopping once enough URLs are collected.
/// This path is rare and small-fanout; serial fetching keeps it simple.
async fn resolve_index(fetcher: &dyn FetchText, sub_sitemaps: &[String]) -> Vec<String> {
    let mut urls = Vec::new();
    for sub in sub_sitemaps.iter().take(MAX_SUB_SITEMAPS) {
        if urls.len() >= MAX_SITEMAP_URLS {
            break;
        }
        let Some(body) = fetcher.fetch_text(sub).await else {
            tracing::debug!("[SITEMAP] Sub-sitemap unavailable: {}", sub);
            continue;
        };
        let doc = parse_sitemap(&body);
        tracing::trace!("[SITEMAP] {} contributed {} URLs", sub, doc.pages.len());
        urls.extend(doc.pages);
    }
    urls
}

/// Extract `<loc>` entries, tracking whether each sits inside a `<sitemap>`
/// (index entry) or a `<url>` (page entry). Parse errors end extraction but
/// keep whatever was collected so far.
fn parse_sitemap(text: &str) -> SitemapDoc {
    let mut reader = quick_xml::Reader::from_str(text);
    let mut doc = SitemapDoc::default();
    let mut buf = Vec::new();
    let mut in_sitemap_entry = false;
    let mut in_url_entry = false;
    let mut in_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap_entry = true,
                b"url" => in_url_entry = true,
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap_entry = false,
                b"url" => in_url_entry = false,
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => match e.decode() {
                Ok(txt) => push_loc(&mut doc, txt.trim(), in_sitemap_entry, in_url_entry),
                Err(e) => {
                    tracing::warn!("[SITEMAP] Invalid loc text at {}: {}", reader.buffer_position(), e);
                }
            },
            Ok(Event::CData(e)) if in_loc => {
                let txt = String::from_utf8_lossy(e.as_ref());
                push_loc(&mut doc, txt.trim(), in_sitemap_entry, in_url_entry);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("[SITEMAP] Malformed XML at {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    doc
}

fn push_loc(doc: &mut SitemapDoc, loc: &str, in_sitemap_entry: bool, in_url_entry: bool) {
    if loc.is_empty() {
        return;
    }
    if in_sitemap_entry {
        doc.sub_sitemaps.push(loc.to_string());
    } else if in_url_entry {
        doc.pages.push(loc.to_string());
    }
}

//! Site crawl orchestration.
//!
//! Discovers a site's pages, audits each one along both axes off a single
//! fetch, cross-references search-console rows, and aggregates site-wide
//! statistics.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::models::{
    CrawlAggregates, GscPageRow, IssueFrequency, PageAudit, PageFullAudit, SiteCrawlResult,
};
use crate::extractor::sitemap;
use crate::service::auditor::{llmo, seo, UNREACHABLE_MESSAGE};
use crate::service::concurrency::map_batched;
use crate::service::gsc;
use crate::service::http::FetchText;

/// Pages fetched and audited concurrently. Batches are sequential, so this
/// is also the peak number of HTML bodies held in memory.
pub const AUDIT_CONCURRENCY: usize = 4;

/// Default cap on audited pages per crawl.
pub const DEFAULT_MAX_PAGES: usize = 30;

/// Title score from which a title counts as good.
const GOOD_TITLE_SCORE: u8 = 80;
/// Meta-description score from which a description counts as adequate.
const ADEQUATE_META_SCORE: u8 = 60;
/// LLMO score under which a page lands in the needs-attention bucket.
const LLMO_ATTENTION_FLOOR: u8 = 40;
/// Issue-frequency tables keep only the most common entries.
const TOP_ISSUES_LIMIT: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Search-console page rows to cross-reference by path.
    pub gsc_pages: Vec<GscPageRow>,
    /// Overrides [`DEFAULT_MAX_PAGES`] when set.
    pub max_pages: Option<usize>,
}

pub struct SiteCrawler {
    fetcher: Arc<dyn FetchText>,
}

impl SiteCrawler {
    pub fn new(fetcher: Arc<dyn FetchText>) -> Self {
        Self { fetcher }
    }

    /// Crawl a site and audit its pages. Never fails: unreachable pages are
    /// recorded, an unreachable site degrades to a single fetch-failed page.
    pub async fn crawl_site(&self, website_url: &str, options: CrawlOptions) -> SiteCrawlResult {
        let start = Instant::now();
        let base = website_url.trim_end_matches('/').to_string();
        let max_pages = options.max_pages.unwrap_or(DEFAULT_MAX_PAGES);

        tracing::info!("[CRAWL] Starting crawl of {} (max {} pages)", base, max_pages);

        let discovery = sitemap::discover(self.fetcher.as_ref(), &base).await;
        let (urls, pages_discovered) = if discovery.urls.is_empty() {
            tracing::info!("[CRAWL] No sitemap URLs, auditing base URL only");
            (vec![base.clone()], 1)
        } else {
            let discovered = discovery.urls.len();
            let mut urls = discovery.urls;
            urls.truncate(max_pages);
            (urls, discovered)
        };

        tracing::info!(
            "[CRAWL] Auditing {} of {} discovered pages",
            urls.len(),
            pages_discovered
        );

        let fetcher = self.fetcher.clone();
        let mut pages: Vec<PageFullAudit> = map_batched(urls, AUDIT_CONCURRENCY, |url| {
            let fetcher = fetcher.clone();
            async move { audit_one(fetcher.as_ref(), &url).await }
        })
        .await;

        for page in &mut pages {
            page.gsc = gsc::match_page(&page.seo.url, &options.gsc_pages);
        }

        let aggregated = aggregate(&pages);
        tracing::info!(
            "[CRAWL] Complete in {:?} - {} pages audited, avg seo {}, avg llmo {}",
            start.elapsed(),
            pages.len(),
            aggregated.avg_seo_score,
            aggregated.avg_llmo_score
        );

        SiteCrawlResult {
            sitemap_url: discovery.sitemap_url,
            pages_discovered,
            pages_audited: pages.len(),
            pages,
            aggregated,
        }
    }
}

/// Audit one page along both axes off a single fetch.
async fn audit_one(fetcher: &dyn FetchText, url: &str) -> PageFullAudit {
    tracing::debug!("[CRAWL] Auditing {}", url);
    match fetcher.fetch_text(url).await {
        Some(html) => PageFullAudit {
            seo: seo::analyze_html(url, &html),
            llmo: llmo::audit_html(&html),
            gsc: None,
        },
        None => PageFullAudit {
            seo: PageAudit::unreachable(url, UNREACHABLE_MESSAGE),
            llmo: llmo::audit_html(""),
            gsc: None,
        },
    }
}

/// Site-wide aggregates. Pages with a fetch error never contribute to any
/// average or count; with zero reachable pages everything stays zero/empty.
fn aggregate(pages: &[PageFullAudit]) -> CrawlAggregates {
    let reachable: Vec<&PageFullAudit> = pages
        .iter()
        .filter(|p| p.seo.fetch_error.is_none())
        .collect();
    if reachable.is_empty() {
        return CrawlAggregates::default();
    }

    let n = reachable.len() as f64;
    let avg_seo_score = (reachable
        .iter()
        .map(|p| f64::from(p.seo.overall_score))
        .sum::<f64>()
        / n)
        .round() as u8;
    let avg_llmo_score = (reachable
        .iter()
        .map(|p| f64::from(p.llmo.score))
        .sum::<f64>()
        / n)
        .round() as u8;

    let mut seo_issues: BTreeMap<String, usize> = BTreeMap::new();
    let mut llmo_issues: BTreeMap<String, usize> = BTreeMap::new();
    let mut schema_type_counts: BTreeMap<String, usize> = BTreeMap::new();

    for page in &reachable {
        let audit = &page.seo;
        for issue in audit
            .title
            .issues
            .iter()
            .chain(&audit.meta_description.issues)
            .chain(&audit.h1.issues)
            .chain(&audit.images.issues)
        {
            *seo_issues.entry(issue.clone()).or_default() += 1;
        }
        for issue in &page.llmo.issues {
            *llmo_issues.entry(issue.clone()).or_default() += 1;
        }
        for schema_type in &audit.schema.types {
            *schema_type_counts.entry(schema_type.clone()).or_default() += 1;
        }
    }

    CrawlAggregates {
        avg_seo_score,
        avg_llmo_score,
        top_seo_issues: top_issues(seo_issues),
        top_llmo_issues: top_issues(llmo_issues),
        schema_type_counts,
        pages_with_faq_schema: count(&reachable, |p| p.llmo.signals.has_faq_schema),
        pages_with_article_schema: count(&reachable, |p| p.llmo.signals.has_article_schema),
        pages_with_good_title: count(&reachable, |p| p.seo.title.score >= GOOD_TITLE_SCORE),
        pages_with_meta_description: count(&reachable, |p| {
            p.seo.meta_description.score >= ADEQUATE_META_SCORE
        }),
        pages_below_llmo_floor: count(&reachable, |p| p.llmo.score < LLMO_ATTENTION_FLOOR),
    }
}

fn count(pages: &[&PageFullAudit], predicate: impl Fn(&PageFullAudit) -> bool) -> usize {
    pages.iter().filter(|p| predicate(p)).count()
}

/// Sort descending by frequency (alphabetical within ties, since the input
/// map iterates in key order) and keep the top entries.
fn top_issues(counts: BTreeMap<String, usize>) -> Vec<IssueFrequency> {
    let mut table: Vec<IssueFrequency> = counts
        .into_iter()
        .map(|(issue, count)| IssueFrequency { issue, count })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count));
    table.truncate(TOP_ISSUES_LIMIT);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory fetcher that records how often each URL was requested.
    struct MapFetcher {
        bodies: HashMap<String, String>,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl MapFetcher {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                bodies: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                hits: Mutex::new(HashMap::new()),
            }
        }

        fn hits_for(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl FetchText for MapFetcher {
        async fn fetch_text(&self, url: &str) -> Option<String> {
            *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
            self.bodies.get(url).cloned()
        }
    }

    fn page_html(title: &str, body: &str) -> String {
        format!("<html><head><title>{}</title></head><body>{}</body></html>", title, body)
    }

    fn urlset(urls: &[&str]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<url><loc>{}</loc></url>", u))
            .collect();
        format!("<urlset>{}</urlset>", entries)
    }

    #[tokio::test]
    async fn falls_back_to_base_url_without_sitemap() {
        let fetcher = Arc::new(MapFetcher::new(&[(
            "https://site.com",
            &page_html("A title of a reasonable length", "<h1>Fallback homepage</h1>"),
        )]));
        let crawler = SiteCrawler::new(fetcher.clone());

        let result = crawler
            .crawl_site("https://site.com/", CrawlOptions::default())
            .await;

        assert_eq!(result.pages_discovered, 1);
        assert_eq!(result.pages_audited, 1);
        assert_eq!(result.pages[0].seo.url, "https://site.com");
        assert!(result.sitemap_url.is_none());
    }

    #[tokio::test]
    async fn one_fetch_per_page_shared_by_both_auditors() {
        let html = page_html("Shared fetch page title here", "<h1>One fetch only</h1>");
        let fetcher = Arc::new(MapFetcher::new(&[
            ("https://site.com/sitemap.xml", &urlset(&["https://site.com/a"])),
            ("https://site.com/a", &html),
        ]));
        let crawler = SiteCrawler::new(fetcher.clone());

        let result = crawler
            .crawl_site("https://site.com", CrawlOptions::default())
            .await;

        assert_eq!(result.pages_audited, 1);
        let page = &result.pages[0];
        // Both axes produced from the same body.
        assert!(page.seo.fetch_error.is_none());
        assert!(page.llmo.score > 0 || !page.llmo.issues.is_empty());
        assert_eq!(fetcher.hits_for("https://site.com/a"), 1);
    }

    #[tokio::test]
    async fn reports_untruncated_discovery_count() {
        let urls: Vec<String> = (0..10).map(|i| format!("https://site.com/p{}", i)).collect();
        let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let mut entries = vec![("https://site.com/sitemap.xml".to_string(), urlset(&url_refs))];
        for url in &urls {
            entries.push((url.clone(), page_html("Some discovered page title", "")));
        }
        let entry_refs: Vec<(&str, &str)> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let crawler = SiteCrawler::new(Arc::new(MapFetcher::new(&entry_refs)));

        let result = crawler
            .crawl_site(
                "https://site.com",
                CrawlOptions { max_pages: Some(3), ..Default::default() },
            )
            .await;

        assert_eq!(result.pages_discovered, 10);
        assert_eq!(result.pages_audited, 3);
    }

    #[tokio::test]
    async fn unreachable_pages_are_recorded_but_excluded_from_aggregates() {
        let good = page_html(
            "A good page title of decent length here",
            "<h1>Reachable page heading</h1>",
        );
        let fetcher = Arc::new(MapFetcher::new(&[
            (
                "https://site.com/sitemap.xml",
                &urlset(&["https://site.com/good", "https://site.com/gone"]),
            ),
            ("https://site.com/good", &good),
        ]));
        let crawler = SiteCrawler::new(fetcher);

        let result = crawler
            .crawl_site("https://site.com", CrawlOptions::default())
            .await;

        assert_eq!(result.pages_audited, 2);
        let gone = result
            .pages
            .iter()
            .find(|p| p.seo.url.ends_with("/gone"))
            .unwrap();
        assert!(gone.seo.fetch_error.is_some());
        assert_eq!(gone.seo.overall_score, 0);
        assert_eq!(gone.llmo.score, 0);
        assert_eq!(gone.llmo.issues.len(), 1);

        // Aggregates reflect only the good page.
        let good_page = result
            .pages
            .iter()
            .find(|p| p.seo.url.ends_with("/good"))
            .unwrap();
        assert_eq!(result.aggregated.avg_seo_score, good_page.seo.overall_score);
        assert_eq!(result.aggregated.avg_llmo_score, good_page.llmo.score);
    }

    #[tokio::test]
    async fn all_pages_unreachable_yields_empty_aggregates() {
        let fetcher = Arc::new(MapFetcher::new(&[(
            "https://site.com/sitemap.xml",
            &urlset(&["https://site.com/a", "https://site.com/b"]),
        )]));
        let crawler = SiteCrawler::new(fetcher);

        let result = crawler
            .crawl_site("https://site.com", CrawlOptions::default())
            .await;

        assert_eq!(result.pages_audited, 2);
        assert_eq!(result.aggregated.avg_seo_score, 0);
        assert_eq!(result.aggregated.avg_llmo_score, 0);
        assert!(result.aggregated.top_seo_issues.is_empty());
        assert!(result.aggregated.schema_type_counts.is_empty());
    }

    #[tokio::test]
    async fn gsc_rows_attach_by_path() {
        let fetcher = Arc::new(MapFetcher::new(&[
            (
                "https://site.com/sitemap.xml",
                &urlset(&["https://site.com/blog/post"]),
            ),
            (
                "https://site.com/blog/post",
                &page_html("A blog post title of decent length", ""),
            ),
        ]));
        let crawler = SiteCrawler::new(fetcher);

        let result = crawler
            .crawl_site(
                "https://site.com",
                CrawlOptions {
                    gsc_pages: vec![GscPageRow {
                        page: "https://site.com/blog/post/".to_string(),
                        impressions: 300,
                        clicks: 7,
                        position: 4.2,
                    }],
                    max_pages: None,
                },
            )
            .await;

        let gsc = result.pages[0].gsc.as_ref().unwrap();
        assert_eq!(gsc.impressions, 300);
        assert_eq!(gsc.ctr, 2.3);
    }

    /// Fetcher that tracks concurrent in-flight requests.
    struct RecordingFetcher {
        body: String,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl FetchText for RecordingFetcher {
        async fn fetch_text(&self, url: &str) -> Option<String> {
            if url.contains("sitemap") {
                let urls: Vec<String> =
                    (0..10).map(|i| format!("https://site.com/p{}", i)).collect();
                let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
                return Some(urlset(&refs));
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Some(self.body.clone())
        }
    }

    #[tokio::test]
    async fn page_audits_never_exceed_the_concurrency_bound() {
        let fetcher = Arc::new(RecordingFetcher {
            body: page_html("Concurrency bound check title", ""),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let crawler = SiteCrawler::new(fetcher.clone());

        let result = crawler
            .crawl_site("https://site.com", CrawlOptions::default())
            .await;

        assert_eq!(result.pages_audited, 10);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= AUDIT_CONCURRENCY);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn issue_tables_count_across_pages() {
        // Two pages, both missing meta description.
        let html = page_html("A title of a reasonable length ok", "<h1>Heading long enough</h1>");
        let fetcher = Arc::new(MapFetcher::new(&[
            (
                "https://site.com/sitemap.xml",
                &urlset(&["https://site.com/a", "https://site.com/b"]),
            ),
            ("https://site.com/a", &html),
            ("https://site.com/b", &html),
        ]));
        let crawler = SiteCrawler::new(fetcher);

        let result = crawler
            .crawl_site("https://site.com", CrawlOptions::default())
            .await;

        let meta_issue = result
            .aggregated
            .top_seo_issues
            .iter()
            .find(|f| f.issue.contains("Meta description is missing"))
            .unwrap();
        assert_eq!(meta_issue.count, 2);
        assert!(result.aggregated.top_llmo_issues.len() <= TOP_ISSUES_LIMIT);
        assert_eq!(result.aggregated.pages_with_good_title, 2);
        assert_eq!(result.aggregated.pages_with_meta_description, 0);
        assert_eq!(result.aggregated.pages_below_llmo_floor, 2);
    }
}

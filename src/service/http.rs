//! HTTP fetch transport.
//!
//! All page and sitemap retrieval goes through [`FetchText`]: a bounded
//! GET that returns body text or `None`. Failures are never surfaced as
//! errors; a page that cannot be fetched is an audit fact, not a fault.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Per-request timeout. Enforced by the client as a whole-request abort.
pub const FETCH_TIMEOUT_MS: u64 = 8_000;

/// User agent identifying the crawler to target sites.
pub const CRAWLER_USER_AGENT: &str = "BrandsightBot/0.1 (+https://brandsight.app/bot)";

#[async_trait]
pub trait FetchText: Send + Sync {
    /// Fetch a URL and return its body text. Returns `None` on any
    /// transport failure, timeout, or non-success status.
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

/// Reqwest-backed fetcher with the crawl timeout and user agent baked in.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent(CRAWLER_USER_AGENT)
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchText for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("[FETCH] {} failed: {}", url, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("[FETCH] {} returned status {}", url, status);
            return None;
        }

        match response.text().await {
            Ok(body) => {
                tracing::trace!("[FETCH] {} -> {} bytes", url, body.len());
                Some(body)
            }
            Err(e) => {
                tracing::debug!("[FETCH] Failed to read body from {}: {}", url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new();
        let body = fetcher.fetch_text(&format!("{}/page", server.url())).await;
        assert_eq!(body.as_deref(), Some("<html>ok</html>"));
    }

    #[tokio::test]
    async fn non_success_status_is_none() {
        let mut server = mockito::Server::new_async().await;
        for status in [404, 500] {
            let _mock = server
                .mock("GET", "/err")
                .with_status(status)
                .create_async()
                .await;

            let fetcher = HttpFetcher::new();
            let body = fetcher.fetch_text(&format!("{}/err", server.url())).await;
            assert!(body.is_none(), "status {} should yield None", status);
        }
    }

    #[tokio::test]
    async fn connection_failure_is_none() {
        // Nothing listens on this port.
        let fetcher = HttpFetcher::with_timeout(Duration::from_millis(500));
        let body = fetcher.fetch_text("http://127.0.0.1:9/unreachable").await;
        assert!(body.is_none());
    }
}

//! HTTP client for watch-page and player-script requests

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Thin wrapper over [`reqwest::Client`] with the browser-like header set the
/// platform expects from a desktop visitor.
#[derive(Clone)]
pub struct PageClient {
    http: Client,
}

impl PageClient {
    pub fn new() -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-us,en;q=0.5"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert("x-youtube-client-name", HeaderValue::from_static("1"));

        let http = Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { http })
    }

    /// Fetch a URL and return the response body as text
    pub async fn fetch_text(&self, url: &str) -> crate::Result<String> {
        debug!(url, "fetching");
        let response = self.http.get(url).send().await?;
        let body = response.error_for_status()?.text().await?;
        Ok(body)
    }
}

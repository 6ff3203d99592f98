//! Outbound retrieval: the `Transport` seam, the blocking reqwest client behind it, and the page
//! fetcher that attaches per-platform headers and classifies HTTP failures.

use crate::model::Platform;
use crate::scraper::error::ScraperError;
use rand::seq::SliceRandom;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Used when the pool is empty.
pub const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Desktop browser identifiers sampled once per session.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.2; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Pick one user agent at random from `pool`.
pub fn pick_user_agent<S: AsRef<str>>(pool: &[S]) -> String {
    pool.choose(&mut rand::thread_rng())
        .map(|s| s.as_ref().to_string())
        .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string())
}

/// Raw HTTP result: status plus body text, uninterpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can perform one GET. Direct fetches and relay fetches both go through this.
pub trait Transport {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse, ScraperError>;
}

/// Blocking reqwest client. One request at a time, no retries.
#[derive(Debug)]
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }
}

impl Transport for HttpClient {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse, ScraperError> {
        let mut request = self.inner.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().map_err(|e| ScraperError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ScraperError::BodyRead { source: e })?;
        Ok(RawResponse { status, body })
    }
}

/// Builder for HttpClient. User agents are sent per request, not set here.
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout_secs: u64,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpClientBuilder {
    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpClient { inner })
    }
}

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Desktop-browser header set. Syosetu filters requests that don't look like navigation.
pub fn browser_headers(user_agent: &str) -> Vec<(&'static str, &str)> {
    vec![
        ("User-Agent", user_agent),
        ("Cookie", "over18=yes"),
        ("Accept", BROWSER_ACCEPT),
        ("Accept-Language", "en-US,en;q=0.9,ja;q=0.8"),
        ("Referer", "https://syosetu.com/"),
        (
            "Sec-Ch-Ua",
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
        ),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "\"Windows\""),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "cross-site"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
}

pub fn platform_headers(platform: Platform, user_agent: &str) -> Vec<(&'static str, &str)> {
    match platform {
        Platform::Narou => browser_headers(user_agent),
        Platform::Kakuyomu => vec![("User-Agent", user_agent)],
    }
}

/// Turn a raw response into body text. 403 becomes `Blocked`, other non-2xx `FetchFailed`.
pub fn check_response(response: RawResponse, url: &str) -> Result<String, ScraperError> {
    if response.is_success() {
        return Ok(response.body);
    }
    if response.status == 403 {
        return Err(ScraperError::Blocked {
            url: url.to_string(),
        });
    }
    Err(ScraperError::FetchFailed {
        status: response.status,
        url: url.to_string(),
    })
}

/// Single GET of a page with platform-appropriate headers.
pub fn fetch_page(
    transport: &mut dyn Transport,
    url: &str,
    user_agent: &str,
    platform: Platform,
) -> Result<String, ScraperError> {
    let headers = platform_headers(platform, user_agent);
    let response = transport.get(url, &headers)?;
    check_response(response, url)
}

//! Test helpers: an in-memory transport serving scripted pages and recording every request.

use crate::scraper::client::{RawResponse, Transport};
use crate::scraper::error::ScraperError;

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    exact: Vec<(String, RawResponse)>,
    prefixed: Vec<(String, RawResponse)>,
    requests: Vec<(String, Vec<(String, String)>)>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for exactly `url`.
    pub fn page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.exact.push((
            url.to_string(),
            RawResponse {
                status,
                body: body.to_string(),
            },
        ));
        self
    }

    /// Serve `body` with `status` for any URL starting with `prefix` (checked after exact matches).
    pub fn prefix(mut self, prefix: &str, status: u16, body: &str) -> Self {
        self.prefixed.push((
            prefix.to_string(),
            RawResponse {
                status,
                body: body.to_string(),
            },
        ));
        self
    }

    pub fn requested_urls(&self) -> Vec<&str> {
        self.requests.iter().map(|(u, _)| u.as_str()).collect()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.iter().filter(|(u, _)| u == url).count()
    }

    pub fn headers_for(&self, url: &str) -> Vec<(String, String)> {
        self.requests
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, h)| h.clone())
            .unwrap_or_default()
    }
}

impl Transport for ScriptedTransport {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> Result<RawResponse, ScraperError> {
        self.requests.push((
            url.to_string(),
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        let hit = self
            .exact
            .iter()
            .find(|(u, _)| u == url)
            .or_else(|| self.prefixed.iter().find(|(p, _)| url.starts_with(p.as_str())))
            .map(|(_, r)| r.clone());
        Ok(hit.unwrap_or(RawResponse {
            status: 404,
            body: String::new(),
        }))
    }
}

//! Shared error type for the chapter-chain core. Heuristic misses never surface here; only
//! transport, relay, and required-structure failures do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    // Input
    #[error("Invalid Book ID or URL: '{input}'")]
    InvalidIdentifier { input: String },

    #[error("{message}")]
    InvalidRequest { message: String },

    // HTTP and network
    #[error("Access blocked (HTTP 403) at {url}. The site is likely filtering this network.")]
    Blocked { url: String },

    #[error("HTTP {status} when fetching: {url}")]
    FetchFailed { status: u16, url: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    // Parsing
    #[error("Could not parse novel page: {message}")]
    ExtractionFailed { message: String },

    // Fallback and traversal
    #[error("All retrieval paths failed for {url} (direct fetch blocked, every relay returned nothing).")]
    AllRetrievalPathsExhausted { url: String },

    #[error("Traversal stopped at episode {episode}: {source}")]
    PartialTraversalStop {
        episode: u32,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("No chapters could be retrieved.")]
    NoChaptersRetrieved,
}

impl ScraperError {
    /// Failures that move the session onto the relay path: a 403 block or any 5xx.
    pub fn is_switch_worthy(&self) -> bool {
        match self {
            ScraperError::Blocked { .. } => true,
            ScraperError::FetchFailed { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

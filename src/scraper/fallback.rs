//! Fallback orchestration: each unit of work (one info call or one episode call) tries the direct
//! fetch first; a block or server error moves the whole session onto the relays for good.

use crate::model::Platform;
use crate::scraper::client::{fetch_page, Transport};
use crate::scraper::error::ScraperError;
use crate::scraper::relay::fetch_via_relays;
use tracing::{info, warn};

/// Session-scoped retrieval mode. Owned by the caller and passed to every step, so separate
/// sessions never share it. The switch to fallback is one-way.
#[derive(Debug, Default, Clone)]
pub struct TraversalState {
    using_fallback: bool,
}

impl TraversalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn using_fallback(&self) -> bool {
        self.using_fallback
    }

    fn enter_fallback(&mut self) {
        self.using_fallback = true;
    }
}

/// Retrieve `url` and run `parse` on its markup.
///
/// Direct path first, unless the session already switched. A switch-worthy failure flips `state`
/// and falls through to the relays; any other direct-path failure is returned as-is. The relay
/// path hands its markup to the same `parse` (parse-only mode).
pub fn retrieve<T, F>(
    state: &mut TraversalState,
    transport: &mut dyn Transport,
    url: &str,
    user_agent: &str,
    platform: Platform,
    parse: F,
) -> Result<T, ScraperError>
where
    F: Fn(&str) -> Result<T, ScraperError>,
{
    if !state.using_fallback() {
        match fetch_page(transport, url, user_agent, platform) {
            Ok(html) => return parse(&html),
            Err(e) if e.is_switch_worthy() => {
                warn!(url = %url, error = %e, "direct fetch blocked, switching to relay path");
                state.enter_fallback();
            }
            Err(e) => return Err(e),
        }
    }
    let markup = fetch_via_relays(transport, url, user_agent).ok_or_else(|| {
        ScraperError::AllRetrievalPathsExhausted {
            url: url.to_string(),
        }
    })?;
    info!(url = %url, "retrieved via relay");
    parse(&markup)
}

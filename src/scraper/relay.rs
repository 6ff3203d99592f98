//! Third-party relays that fetch a page on our behalf. Used only after the direct path is blocked.

use crate::scraper::client::{browser_headers, Transport};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::{debug, warn};

const CORSPROXY_BASE: &str = "https://corsproxy.io/?";
const ALLORIGINS_BASE: &str = "https://api.allorigins.win/get";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    /// Returns the target's markup as-is.
    CorsProxy,
    /// Returns a JSON envelope whose `contents` field holds the markup.
    AllOrigins,
}

/// Tried in this order; the first non-empty result wins.
pub const RELAYS: &[Relay] = &[Relay::CorsProxy, Relay::AllOrigins];

#[derive(Debug, Deserialize)]
struct AllOriginsEnvelope {
    contents: Option<String>,
}

impl Relay {
    pub fn name(self) -> &'static str {
        match self {
            Relay::CorsProxy => "corsproxy.io",
            Relay::AllOrigins => "allorigins",
        }
    }

    /// Relay URL for `target`. allorigins gets a timestamp so its cache is bypassed.
    pub fn request_url(self, target: &str) -> String {
        let encoded = utf8_percent_encode(target, NON_ALPHANUMERIC);
        match self {
            Relay::CorsProxy => format!("{}{}", CORSPROXY_BASE, encoded),
            Relay::AllOrigins => format!(
                "{}?url={}&timestamp={}",
                ALLORIGINS_BASE,
                encoded,
                chrono::Utc::now().timestamp_millis()
            ),
        }
    }

    /// Fetch `target` through this relay. `None` on any failure or empty content.
    pub fn fetch(self, transport: &mut dyn Transport, target: &str, user_agent: &str) -> Option<String> {
        let url = self.request_url(target);
        let headers = match self {
            Relay::CorsProxy => browser_headers(user_agent),
            Relay::AllOrigins => vec![("User-Agent", user_agent)],
        };
        let response = match transport.get(&url, &headers) {
            Ok(r) => r,
            Err(e) => {
                warn!(relay = self.name(), error = %e, "relay request failed");
                return None;
            }
        };
        if !response.is_success() {
            warn!(relay = self.name(), status = response.status, "relay returned error status");
            return None;
        }
        let markup = match self {
            Relay::CorsProxy => Some(response.body),
            Relay::AllOrigins => match serde_json::from_str::<AllOriginsEnvelope>(&response.body) {
                Ok(envelope) => envelope.contents,
                Err(e) => {
                    warn!(relay = self.name(), error = %e, "relay returned malformed JSON");
                    None
                }
            },
        };
        let markup = markup.filter(|m| !m.trim().is_empty());
        if markup.is_none() {
            warn!(relay = self.name(), target = %target, "relay returned no content");
        }
        markup
    }
}

/// Try every relay in order and return the first non-empty markup.
pub fn fetch_via_relays(
    transport: &mut dyn Transport,
    target: &str,
    user_agent: &str,
) -> Option<String> {
    RELAYS.iter().find_map(|relay| {
        debug!(relay = relay.name(), target = %target, "fetching via relay");
        relay.fetch(transport, target, user_agent)
    })
}

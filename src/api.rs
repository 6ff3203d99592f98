//! Request/response entry point: one JSON request record in, one response record out. The
//! `parse-*` request types run extraction on supplied markup without fetching anything.

use crate::model::{BookIdentifier, ChapterRecord, NarouDomain, NovelInfo, Platform};
use crate::scraper::{
    detect_platform, extractor_for, fetch_episode, fetch_info, pick_user_agent, url_platform,
    ScraperError, TraversalState, Transport, DEFAULT_USER_AGENTS,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// `info`, `episode`, `parse-info` or `parse-episode`.
    #[serde(rename = "type")]
    pub kind: String,
    pub book_id: Option<String>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub platform: Option<Platform>,
    /// Syosetu host, e.g. `novel18.syosetu.com`.
    pub domain: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DownloadResponse {
    Info(NovelInfo),
    Episode(ChapterRecord),
    Error { error: String },
}

impl From<ScraperError> for DownloadResponse {
    fn from(e: ScraperError) -> Self {
        DownloadResponse::Error {
            error: e.to_string(),
        }
    }
}

fn required<'a>(field: &'a Option<String>, message: &str) -> Result<&'a str, ScraperError> {
    field
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScraperError::InvalidRequest {
            message: message.to_string(),
        })
}

impl DownloadRequest {
    /// Explicit platform, else the URL's site marker, else the book id as the resolver reads it.
    pub fn detect_platform(&self) -> Platform {
        if let Some(p) = self.platform {
            return p;
        }
        self.url
            .as_deref()
            .and_then(url_platform)
            .or_else(|| {
                self.book_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .map(detect_platform)
            })
            .unwrap_or(Platform::Kakuyomu)
    }

    fn narou_domain(&self) -> Result<Option<NarouDomain>, ScraperError> {
        match self.domain.as_deref() {
            None | Some("") => Ok(None),
            Some(host) => NarouDomain::from_host(host).map(Some).ok_or_else(|| {
                ScraperError::InvalidRequest {
                    message: format!("Unsupported domain: {}", host),
                }
            }),
        }
    }

    fn identifier(&self, platform: Platform) -> Result<BookIdentifier, ScraperError> {
        let book_id = required(&self.book_id, "Book ID is required")?;
        let domain = match platform {
            Platform::Narou => Some(self.narou_domain()?.unwrap_or(NarouDomain::Plain)),
            Platform::Kakuyomu => None,
        };
        Ok(BookIdentifier {
            platform,
            book_id: book_id.to_string(),
            domain,
        })
    }
}

/// Handle one request. `state` carries the fallback decision across requests of one session.
pub fn handle_request(
    state: &mut TraversalState,
    transport: &mut dyn Transport,
    request: &DownloadRequest,
) -> DownloadResponse {
    match dispatch(state, transport, request) {
        Ok(response) => response,
        Err(e) => e.into(),
    }
}

fn dispatch(
    state: &mut TraversalState,
    transport: &mut dyn Transport,
    request: &DownloadRequest,
) -> Result<DownloadResponse, ScraperError> {
    let user_agent = match request.user_agent.as_deref().filter(|s| !s.is_empty()) {
        Some(ua) => ua.to_string(),
        None => pick_user_agent(DEFAULT_USER_AGENTS),
    };
    let platform = request.detect_platform();

    match request.kind.as_str() {
        "info" => {
            let id = request.identifier(platform)?;
            let info = fetch_info(state, transport, &id, &user_agent)?;
            Ok(DownloadResponse::Info(info))
        }
        "episode" => {
            let url = required(&request.url, "URL is required")?;
            let record = fetch_episode(state, transport, platform, url, &user_agent)?;
            Ok(DownloadResponse::Episode(record))
        }
        "parse-info" => {
            let html = required(&request.html, "HTML is required")?;
            let id = request.identifier(platform)?;
            let extractor = extractor_for(platform);
            let info_url = extractor.info_url(&id);
            let (title, first_chapter_url) = extractor.parse_info(html, &info_url)?;
            Ok(DownloadResponse::Info(NovelInfo {
                title,
                first_chapter_url,
                user_agent,
            }))
        }
        "parse-episode" => {
            let (html, url) = match (
                required(&request.html, "HTML and URL are required"),
                required(&request.url, "HTML and URL are required"),
            ) {
                (Ok(html), Ok(url)) => (html, url),
                (Err(e), _) | (_, Err(e)) => return Err(e),
            };
            let record = extractor_for(platform).parse_episode(html, url);
            Ok(DownloadResponse::Episode(record))
        }
        _ => Err(ScraperError::InvalidRequest {
            message: "Invalid request type".to_string(),
        }),
    }
}

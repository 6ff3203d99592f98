//! Platform detection, extractors, retrieval, and the download session that ties them together.

mod client;
mod error;
mod fallback;
mod heuristics;
mod relay;
mod traversal;

pub mod kakuyomu;
pub mod narou;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{
    fetch_page, pick_user_agent, HttpClient, HttpClientBuilder, RawResponse, Transport,
    DEFAULT_USER_AGENTS,
};
pub use error::ScraperError;
pub use fallback::{retrieve, TraversalState};
pub use relay::{fetch_via_relays, Relay};
pub use traversal::{traverse, Traversal};

use crate::model::{Book, BookIdentifier, ChapterRecord, NarouDomain, NovelInfo, Platform};
use tracing::info;

const KAKUYOMU_WORK_MARKER: &str = "kakuyomu.jp/works/";
const NAROU_MARKERS: &[(&str, NarouDomain)] = &[
    ("ncode.syosetu.com/", NarouDomain::Plain),
    ("novel18.syosetu.com/", NarouDomain::Adult),
];

/// Strip known site suffix from the end of a page title (e.g. " - カクヨム") so that titles
/// containing the separator themselves are preserved.
pub fn strip_title_site_suffix(s: &str, suffixes: &[&str]) -> String {
    let mut t = s.trim();
    for suffix in suffixes {
        if t.ends_with(suffix) {
            t = t[..t.len() - suffix.len()].trim();
            break;
        }
    }
    t.to_string()
}

/// Path segment right after `marker`, cut at the next `/`, `?` or `#`.
fn segment_after<'a>(input: &'a str, marker: &str) -> Option<&'a str> {
    let start = input.find(marker)? + marker.len();
    let rest = &input[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Platform, id segment and Syosetu host named by a URL's site marker.
fn url_marker(input: &str) -> Option<(Platform, &str, Option<NarouDomain>)> {
    if let Some(id) = segment_after(input, KAKUYOMU_WORK_MARKER) {
        return Some((Platform::Kakuyomu, id, None));
    }
    NAROU_MARKERS.iter().find_map(|(marker, domain)| {
        segment_after(input, marker).map(|id| (Platform::Narou, id, Some(*domain)))
    })
}

/// A bare Syosetu ncode starts with `n` or `N`.
fn bare_id_platform(id: &str) -> Platform {
    if id.starts_with(['n', 'N']) {
        Platform::Narou
    } else {
        Platform::Kakuyomu
    }
}

/// Platform named by a URL, if it carries a known site marker.
pub fn url_platform(url: &str) -> Option<Platform> {
    url_marker(url.trim()).map(|(platform, _, _)| platform)
}

/// Platform that [resolve_identifier] would pick for `input`.
pub fn detect_platform(input: &str) -> Platform {
    let trimmed = input.trim();
    url_platform(trimmed).unwrap_or_else(|| bare_id_platform(trimmed))
}

/// Resolve free-form input (work URL, chapter URL, or bare id) into a book identifier.
///
/// Kakuyomu URLs are recognized by their work path, Syosetu URLs by either host. A bare id
/// starting with `n`/`N` is taken as a Syosetu ncode on the plain host; anything else as a
/// Kakuyomu work id.
pub fn resolve_identifier(input: &str) -> Result<BookIdentifier, ScraperError> {
    let trimmed = input.trim();
    let invalid = || ScraperError::InvalidIdentifier {
        input: input.to_string(),
    };

    let (platform, book_id, domain) = match url_marker(trimmed) {
        Some(found) => found,
        None => match bare_id_platform(trimmed) {
            Platform::Narou => (Platform::Narou, trimmed, Some(NarouDomain::Plain)),
            Platform::Kakuyomu => (Platform::Kakuyomu, trimmed, None),
        },
    };

    if book_id.is_empty() {
        return Err(invalid());
    }
    Ok(BookIdentifier {
        platform,
        book_id: book_id.to_string(),
        domain,
    })
}

/// Like [resolve_identifier], but an explicit platform wins over detection.
pub fn resolve_identifier_as(
    input: &str,
    platform: Option<Platform>,
) -> Result<BookIdentifier, ScraperError> {
    let mut id = resolve_identifier(input)?;
    match platform {
        Some(Platform::Narou) => {
            id.platform = Platform::Narou;
            id.domain = id.domain.or(Some(NarouDomain::Plain));
        }
        Some(Platform::Kakuyomu) => {
            id.platform = Platform::Kakuyomu;
            id.domain = None;
        }
        None => {}
    }
    Ok(id)
}

/// One platform's page extraction. Extractors never fetch; they only read markup they are given,
/// so the direct path and the relay path share them.
pub trait Extractor {
    fn platform(&self) -> Platform;

    /// Page the info step retrieves.
    fn info_url(&self, id: &BookIdentifier) -> String;

    /// `(title, first chapter URL)` from the info page. Fails when required structure is absent.
    fn parse_info(&self, html: &str, info_url: &str) -> Result<(String, String), ScraperError>;

    /// Title, normalized body and absolute next link of one chapter page. An empty body (with no
    /// next link) means the chain has ended.
    fn parse_episode(&self, html: &str, url: &str) -> ChapterRecord;
}

pub fn extractor_for(platform: Platform) -> &'static dyn Extractor {
    match platform {
        Platform::Kakuyomu => &kakuyomu::KakuyomuExtractor,
        Platform::Narou => &narou::NarouExtractor,
    }
}

/// Info step through the fallback orchestrator.
pub fn fetch_info(
    state: &mut TraversalState,
    transport: &mut dyn Transport,
    id: &BookIdentifier,
    user_agent: &str,
) -> Result<NovelInfo, ScraperError> {
    let extractor = extractor_for(id.platform);
    let info_url = extractor.info_url(id);
    let (title, first_chapter_url) =
        retrieve(state, transport, &info_url, user_agent, id.platform, |html| {
            extractor.parse_info(html, &info_url)
        })?;
    Ok(NovelInfo {
        title,
        first_chapter_url,
        user_agent: user_agent.to_string(),
    })
}

/// One episode step through the fallback orchestrator.
pub fn fetch_episode(
    state: &mut TraversalState,
    transport: &mut dyn Transport,
    platform: Platform,
    url: &str,
    user_agent: &str,
) -> Result<ChapterRecord, ScraperError> {
    let extractor = extractor_for(platform);
    retrieve(state, transport, url, user_agent, platform, |html| {
        Ok(extractor.parse_episode(html, url))
    })
}

/// Session milestones reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    FetchingInfo,
    Found { title: &'a str },
    Episode(u32),
}

/// Result of a whole download session.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub book: Book,
    /// Set when the chain was cut short; the gathered chapters are still in `book`.
    pub stopped: Option<ScraperError>,
    pub used_fallback: bool,
    /// Final human-readable status line.
    pub status: String,
}

/// Run a full session: info step, then the chapter chain. The user agent is fixed for the whole
/// session and so is the fallback decision once taken.
pub fn download_novel(
    transport: &mut dyn Transport,
    id: &BookIdentifier,
    user_agent: &str,
    progress: &mut dyn FnMut(Progress<'_>),
) -> Result<DownloadOutcome, ScraperError> {
    let mut state = TraversalState::new();
    progress(Progress::FetchingInfo);
    let info = fetch_info(&mut state, transport, id, user_agent)?;
    info!(title = %info.title, first = %info.first_chapter_url, "novel found");
    progress(Progress::Found { title: &info.title });

    let book = Book::new(info.title.clone(), id.book_id.clone());
    let extractor = extractor_for(id.platform);
    let Traversal { book, stopped } = traverse(
        &mut state,
        transport,
        extractor,
        &info,
        book,
        &mut |n| progress(Progress::Episode(n)),
    )?;
    if book.chapters.is_empty() {
        return Err(ScraperError::NoChaptersRetrieved);
    }

    let mut status = format!("Downloaded {} episodes", book.chapters.len());
    if state.using_fallback() {
        status.push_str(" (via relay)");
    }
    if let Some(e) = &stopped {
        status.push_str(&format!("; stopped early: {}", e));
    }
    Ok(DownloadOutcome {
        book,
        stopped,
        used_fallback: state.using_fallback(),
        status,
    })
}

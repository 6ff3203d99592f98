//! Traversal engine: follows each page's next link from the first chapter until the chain ends,
//! folding every extracted page into the book in discovery order.

use crate::model::{Book, NovelInfo};
use crate::scraper::client::Transport;
use crate::scraper::error::ScraperError;
use crate::scraper::fallback::{retrieve, TraversalState};
use crate::scraper::Extractor;
use std::collections::HashSet;
use tracing::{info, warn};

/// Chapters gathered plus, if the chain was cut short by a fetch error, why.
#[derive(Debug)]
pub struct Traversal {
    pub book: Book,
    /// `PartialTraversalStop` when a non-block error ended the walk early.
    pub stopped: Option<ScraperError>,
}

/// Walk the chapter chain starting at `info.first_chapter_url`.
///
/// Ends cleanly on an empty body, a missing next link, or a next link already visited, even when
/// that leaves the book empty. A relay exhaustion is fatal. Any other step failure ends the walk
/// but keeps what was gathered; if nothing was, the `PartialTraversalStop` itself is returned.
/// `progress` receives the episode counter before each fetch.
pub fn traverse(
    state: &mut TraversalState,
    transport: &mut dyn Transport,
    extractor: &dyn Extractor,
    info: &NovelInfo,
    mut book: Book,
    progress: &mut dyn FnMut(u32),
) -> Result<Traversal, ScraperError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = Some(info.first_chapter_url.clone());
    let mut episode: u32 = 0;
    let mut stopped = None;

    while let Some(url) = current.take() {
        if !visited.insert(url.clone()) {
            warn!(url = %url, "next link points at an episode already retrieved; stopping");
            break;
        }
        episode += 1;
        progress(episode);

        let result = retrieve(
            state,
            transport,
            &url,
            &info.user_agent,
            extractor.platform(),
            |html| Ok(extractor.parse_episode(html, &url)),
        );
        let record = match result {
            Ok(record) => record,
            Err(e @ ScraperError::AllRetrievalPathsExhausted { .. }) => return Err(e),
            Err(e) => {
                warn!(episode, url = %url, error = %e, "traversal stopped early");
                stopped = Some(ScraperError::PartialTraversalStop {
                    episode,
                    source: Box::new(e),
                });
                break;
            }
        };
        if record.is_end() {
            info!(episode, url = %url, "episode has no content; end of chain");
            break;
        }
        info!(episode, title = %record.title, "episode retrieved");
        current = record.next_url;
        book.push_chapter(record.title, record.body);
    }

    match stopped {
        Some(cause) if book.chapters.is_empty() => Err(cause),
        stopped => Ok(Traversal { book, stopped }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::kakuyomu::KakuyomuExtractor;
    use crate::scraper::relay::Relay;
    use crate::scraper::test_support::ScriptedTransport;

    fn ep_url(n: u32) -> String {
        format!("https://kakuyomu.jp/works/77/episodes/{}", n)
    }

    /// Synthetic episode page; `next` is a site-relative episode number.
    fn ep_page(n: u32, next: Option<u32>) -> String {
        let link = next
            .map(|m| {
                format!(
                    r#"<a id="contentMain-readNextEpisode" href="/works/77/episodes/{}">次のエピソードへ</a>"#,
                    m
                )
            })
            .unwrap_or_default();
        format!(
            r#"<html><body><p class="widget-episodeTitle js-vertical-composition-item">第{n}話</p>
<div class="widget-episodeBody js-episode-body"><p>本文{n}。</p></div>{link}</body></html>"#
        )
    }

    fn info() -> NovelInfo {
        NovelInfo {
            title: "Synthetic".into(),
            first_chapter_url: ep_url(1),
            user_agent: "UA".into(),
        }
    }

    fn run(
        t: &mut ScriptedTransport,
        state: &mut TraversalState,
        seen: &mut Vec<u32>,
    ) -> Result<Traversal, ScraperError> {
        traverse(
            state,
            t,
            &KakuyomuExtractor,
            &info(),
            Book::new("Synthetic", "77"),
            &mut |n| seen.push(n),
        )
    }

    fn titles(book: &Book) -> Vec<&str> {
        book.chapters.iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn follows_chain_until_next_link_is_absent() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 200, &ep_page(2, Some(3)))
            .page(&ep_url(3), 200, &ep_page(3, None));
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let out = run(&mut t, &mut state, &mut seen)?;
        assert_eq!(titles(&out.book), vec!["第1話", "第2話", "第3話"]);
        let files: Vec<_> = out.book.chapters.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(files, vec!["chapter_1.xhtml", "chapter_2.xhtml", "chapter_3.xhtml"]);
        assert_eq!(out.book.chapters[1].body, "<p>本文2。</p>");
        assert!(out.stopped.is_none());
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(!state.using_fallback());
        Ok(())
    }

    #[test]
    fn block_on_second_episode_switches_once_and_keeps_order() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 403, "")
            .page(&ep_url(3), 200, &ep_page(3, None))
            .page(&Relay::CorsProxy.request_url(&ep_url(2)), 200, &ep_page(2, Some(3)))
            .page(&Relay::CorsProxy.request_url(&ep_url(3)), 200, &ep_page(3, None));
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let out = run(&mut t, &mut state, &mut seen)?;
        assert_eq!(titles(&out.book), vec!["第1話", "第2話", "第3話"]);
        assert!(state.using_fallback());
        assert_eq!(t.request_count(&ep_url(1)), 1);
        assert_eq!(t.request_count(&ep_url(2)), 1);
        Ok(())
    }

    #[test]
    fn fallback_mode_never_reverts_to_direct_path() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 403, "")
            .page(&ep_url(3), 200, &ep_page(3, None))
            .page(&Relay::CorsProxy.request_url(&ep_url(2)), 200, &ep_page(2, Some(3)))
            .page(&Relay::CorsProxy.request_url(&ep_url(3)), 200, &ep_page(3, None));
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        run(&mut t, &mut state, &mut seen)?;
        assert_eq!(t.request_count(&ep_url(3)), 0);
        assert_eq!(
            t.request_count(&Relay::CorsProxy.request_url(&ep_url(3))),
            1
        );
        Ok(())
    }

    #[test]
    fn empty_page_terminates_cleanly() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 200, "<html><body><div>no content</div></body></html>");
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let out = run(&mut t, &mut state, &mut seen)?;
        assert_eq!(titles(&out.book), vec!["第1話"]);
        assert!(out.stopped.is_none());
        Ok(())
    }

    #[test]
    fn self_loop_terminates() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 200, &ep_page(2, Some(2)));
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let out = run(&mut t, &mut state, &mut seen)?;
        assert_eq!(titles(&out.book), vec!["第1話", "第2話"]);
        assert_eq!(t.request_count(&ep_url(2)), 1);
        Ok(())
    }

    #[test]
    fn non_block_error_keeps_gathered_chapters() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 200, &ep_page(2, Some(3)))
            .page(&ep_url(3), 404, "");
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let out = run(&mut t, &mut state, &mut seen)?;
        assert_eq!(out.book.chapters.len(), 2);
        assert!(matches!(
            out.stopped,
            Some(ScraperError::PartialTraversalStop { episode: 3, .. })
        ));
        assert!(!state.using_fallback());
        Ok(())
    }

    #[test]
    fn exhausted_relays_abort_traversal() {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, &ep_page(1, Some(2)))
            .page(&ep_url(2), 403, "");
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let result = run(&mut t, &mut state, &mut seen);
        assert!(matches!(
            result,
            Err(ScraperError::AllRetrievalPathsExhausted { .. })
        ));
    }

    #[test]
    fn failure_before_first_chapter_keeps_cause() {
        use std::error::Error;
        let mut t = ScriptedTransport::new().page(&ep_url(1), 404, "");
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let err = match run(&mut t, &mut state, &mut seen) {
            Err(e) => e,
            Ok(out) => panic!("expected an error, got {} chapters", out.book.chapters.len()),
        };
        assert!(matches!(
            err,
            ScraperError::PartialTraversalStop { episode: 1, .. }
        ));
        assert!(err.to_string().contains("HTTP 404"));
        let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("HTTP 404"));
    }

    #[test]
    fn empty_first_page_is_clean_termination() -> Result<(), ScraperError> {
        let mut t = ScriptedTransport::new()
            .page(&ep_url(1), 200, "<html><body><div>no content</div></body></html>");
        let mut state = TraversalState::new();
        let mut seen = Vec::new();
        let out = run(&mut t, &mut state, &mut seen)?;
        assert!(out.book.chapters.is_empty());
        assert!(out.stopped.is_none());
        assert_eq!(seen, vec![1]);
        Ok(())
    }
}

//! Syosetu ("Narou") extractor. There is no reliable info page, so the info step reads chapter 1
//! directly. Chapter pages exist in a 2024 layout (`p-novel__*`) and several older ones
//! (`novel_view`, `novel_honbun`, `novel_bn`), and all of them are still served.

use crate::model::{BookIdentifier, ChapterRecord, NarouDomain, Platform};
use crate::scraper::error::ScraperError;
use crate::scraper::heuristics::{
    container_body, first_match, link_text, paragraphs_within, resolve_href, select_first,
    select_href, select_text, usable_href, Strategy,
};
use crate::scraper::Extractor;
use scraper::{Html, Selector};
use tracing::warn;

pub const NAROU_BASE: &str = "https://ncode.syosetu.com";

/// Localized "next" and "previous" as they appear in pager link text.
const NEXT_WORD: &str = "次";
const PREV_WORD: &str = "前";

pub struct NarouExtractor;

/// Info title: `<title>` up to the first " - " (drops the author/site suffix).
fn novel_title(doc: &Html) -> Option<String> {
    let raw = select_text(doc, "title")?;
    let title = raw.split(" - ").next().unwrap_or("").trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn episode_title_modern(doc: &Html) -> Option<String> {
    select_text(doc, "h1.p-novel__title")
}

fn episode_title_legacy(doc: &Html) -> Option<String> {
    select_text(doc, "p.novel_subtitle")
}

fn episode_title_heading(doc: &Html) -> Option<String> {
    select_text(doc, "h1")
}

const EPISODE_TITLE: &[(&str, Strategy<String>)] = &[
    ("p-novel__title", episode_title_modern),
    ("novel_subtitle", episode_title_legacy),
    ("heading", episode_title_heading),
];

/// 2024 layout: preface, body and afterword each sit in a `p-novel__text` block.
fn body_modern(doc: &Html) -> Option<String> {
    select_first(doc, "div.p-novel__body")?;
    paragraphs_within(doc, "div.p-novel__body div.p-novel__text")
        .or_else(|| container_body(doc, "div.p-novel__body"))
}

fn body_novel_view(doc: &Html) -> Option<String> {
    container_body(doc, "div.novel_view")
}

fn body_honbun(doc: &Html) -> Option<String> {
    container_body(doc, "#novel_honbun")
}

const EPISODE_BODY: &[(&str, Strategy<String>)] = &[
    ("p-novel__body", body_modern),
    ("novel_view", body_novel_view),
    ("novel_honbun", body_honbun),
];

fn next_pager(doc: &Html) -> Option<String> {
    select_href(doc, "a.c-pager__item--next")
}

/// Old bottom navigation: only trust its last link when it reads as "next".
fn next_bottom_nav(doc: &Html) -> Option<String> {
    let nav = select_first(doc, "div.novel_bn")?;
    let a = Selector::parse("a").ok()?;
    let last = nav.select(&a).last()?;
    if !link_text(&last).contains(NEXT_WORD) {
        return None;
    }
    usable_href(&last)
}

/// Last link of the article's first block. Accepted when it reads as "next", or when there are
/// at least two links and it does not read as "previous". Approximate by nature.
fn next_positional(doc: &Html) -> Option<String> {
    let nav = select_first(doc, "body > div.l-container > main > article > div")?;
    let a = Selector::parse("a").ok()?;
    let links: Vec<_> = nav.select(&a).collect();
    let last = links.last()?;
    let text = link_text(last);
    if text.contains(NEXT_WORD) || (links.len() >= 2 && !text.contains(PREV_WORD)) {
        return usable_href(last);
    }
    None
}

const NEXT_LINK: &[(&str, Strategy<String>)] = &[
    ("c-pager next", next_pager),
    ("novel_bn", next_bottom_nav),
    ("positional", next_positional),
];

impl NarouExtractor {
    /// Chapter 1 of `book_id` on the given host.
    pub fn first_chapter_url(book_id: &str, domain: NarouDomain) -> String {
        format!("https://{}/{}/1/", domain.host(), book_id)
    }
}

impl Extractor for NarouExtractor {
    fn platform(&self) -> Platform {
        Platform::Narou
    }

    fn info_url(&self, id: &BookIdentifier) -> String {
        Self::first_chapter_url(&id.book_id, id.domain.unwrap_or(NarouDomain::Plain))
    }

    fn parse_info(&self, html: &str, info_url: &str) -> Result<(String, String), ScraperError> {
        let doc = Html::parse_document(html);
        let title = novel_title(&doc).unwrap_or_else(|| "Unknown Title".to_string());
        Ok((title, info_url.to_string()))
    }

    fn parse_episode(&self, html: &str, url: &str) -> ChapterRecord {
        let doc = Html::parse_document(html);
        let title = first_match(&doc, EPISODE_TITLE).unwrap_or_else(|| "Episode".to_string());
        let Some(body) = first_match(&doc, EPISODE_BODY) else {
            warn!(url = %url, "no content found");
            return ChapterRecord {
                title,
                body: String::new(),
                next_url: None,
            };
        };
        let next_url =
            first_match(&doc, NEXT_LINK).map(|href| resolve_href(&href, url, NAROU_BASE));
        ChapterRecord {
            title,
            body,
            next_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CH2: &str = "https://ncode.syosetu.com/n1234ab/2/";

    #[test]
    fn parse_info_splits_title_suffix() -> Result<(), ScraperError> {
        let html = r#"<html><head><title>転生したら図書館だった件 - 第一話 出会い</title></head><body></body></html>"#;
        let (title, first) = NarouExtractor.parse_info(html, "https://ncode.syosetu.com/n1234ab/1/")?;
        assert_eq!(title, "転生したら図書館だった件");
        assert_eq!(first, "https://ncode.syosetu.com/n1234ab/1/");
        Ok(())
    }

    #[test]
    fn parse_info_without_title_uses_placeholder() -> Result<(), ScraperError> {
        let (title, _) = NarouExtractor.parse_info("<html></html>", "https://ncode.syosetu.com/n1/1/")?;
        assert_eq!(title, "Unknown Title");
        Ok(())
    }

    #[test]
    fn info_url_uses_domain_variant() {
        let id = BookIdentifier {
            platform: Platform::Narou,
            book_id: "n9999zz".into(),
            domain: Some(NarouDomain::Adult),
        };
        assert_eq!(
            NarouExtractor.info_url(&id),
            "https://novel18.syosetu.com/n9999zz/1/"
        );
    }

    #[test]
    fn parse_episode_modern_layout() {
        let html = r#"<html><body><div class="l-container"><main><article>
<h1 class="p-novel__title">第二話 旅立ち</h1>
<div class="p-novel__body">
<div class="js-novel-text p-novel__text p-novel__text--preface"><p id="Lp1">前書きです。</p></div>
<div class="js-novel-text p-novel__text"><p id="L1">本文一行目。</p><p id="L2"><br /></p><p id="L3">本文<ruby>三<rt>さん</rt></ruby>行目。</p></div>
</div>
<div class="c-pager"><a href="/n1234ab/1/" class="c-pager__item c-pager__item--before">前へ</a><a href="/n1234ab/3/" class="c-pager__item c-pager__item--next">次へ</a></div>
</article></main></div></body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(record.title, "第二話 旅立ち");
        assert_eq!(
            record.body,
            "<p>前書きです。</p><p>本文一行目。</p><p><br/></p><p>本文三行目。</p>"
        );
        assert_eq!(
            record.next_url.as_deref(),
            Some("https://ncode.syosetu.com/n1234ab/3/")
        );
    }

    #[test]
    fn parse_episode_legacy_container_with_paragraphs() {
        let html = r#"<html><body>
<div class="novel_bn"><a href="/n1234ab/1/">&lt;&lt; 前へ</a><a href="/n1234ab/3/">次へ &gt;&gt;</a></div>
<p class="novel_subtitle">第二話</p>
<div id="novel_honbun" class="novel_view"><p id="L1">古い本文。</p><p id="L2">二行目。</p></div>
</body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(record.title, "第二話");
        assert_eq!(record.body, "<p>古い本文。</p><p>二行目。</p>");
        assert_eq!(
            record.next_url.as_deref(),
            Some("https://ncode.syosetu.com/n1234ab/3/")
        );
    }

    #[test]
    fn bottom_nav_last_link_must_read_as_next() {
        let html = r#"<html><body>
<div class="novel_bn"><a href="/n1234ab/">目次</a><a href="/n1234ab/1/">&lt;&lt; 前へ</a></div>
<div id="novel_honbun"><p>最終話。</p></div>
</body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert!(record.next_url.is_none());
    }

    #[test]
    fn placeholder_bottom_nav_link_falls_through_to_positional() {
        let html = r##"<html><body><div class="l-container"><main><article>
<div class="nav"><a href="/n1234ab/1/">&lt;&lt; 前へ</a><a href="/n1234ab/3/">次へ &gt;&gt;</a></div>
<div class="novel_bn"><a href="/n1234ab/1/">&lt;&lt; 前へ</a><a href="#">次へ &gt;&gt;</a></div>
<div class="p-novel__body"><p>本文。</p></div>
</article></main></div></body></html>"##;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(
            record.next_url.as_deref(),
            Some("https://ncode.syosetu.com/n1234ab/3/")
        );
    }

    #[test]
    fn positional_fallback_accepts_next_text() {
        let html = r#"<html><body><div class="l-container"><main><article>
<div class="nav"><a href="/n1234ab/">目次</a><a href="/n1234ab/3/">次のエピソード</a></div>
<div class="p-novel__body"><p>本文。</p></div>
</article></main></div></body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(
            record.next_url.as_deref(),
            Some("https://ncode.syosetu.com/n1234ab/3/")
        );
    }

    #[test]
    fn positional_fallback_accepts_unlabelled_last_of_two() {
        let html = r#"<html><body><div class="l-container"><main><article>
<div class="nav"><a href="/n1234ab/1/">&lt;</a><a href="/n1234ab/3/">&gt;</a></div>
<div class="p-novel__body"><p>本文。</p></div>
</article></main></div></body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(
            record.next_url.as_deref(),
            Some("https://ncode.syosetu.com/n1234ab/3/")
        );
    }

    #[test]
    fn positional_fallback_rejects_previous_and_single_links() {
        let prev = r#"<html><body><div class="l-container"><main><article>
<div class="nav"><a href="/n1234ab/">目次</a><a href="/n1234ab/1/">前へ</a></div>
<div class="p-novel__body"><p>本文。</p></div>
</article></main></div></body></html>"#;
        assert!(NarouExtractor.parse_episode(prev, CH2).next_url.is_none());
        let single = r#"<html><body><div class="l-container"><main><article>
<div class="nav"><a href="/n1234ab/">作品トップ</a></div>
<div class="p-novel__body"><p>本文。</p></div>
</article></main></div></body></html>"#;
        assert!(NarouExtractor.parse_episode(single, CH2).next_url.is_none());
    }

    #[test]
    fn next_link_resolves_against_adult_host() {
        let html = r#"<html><body><div class="p-novel__body"><p>本文。</p></div>
<a class="c-pager__item--next" href="/n1234ab/3/">次へ</a></body></html>"#;
        let record = NarouExtractor.parse_episode(html, "https://novel18.syosetu.com/n1234ab/2/");
        assert_eq!(
            record.next_url.as_deref(),
            Some("https://novel18.syosetu.com/n1234ab/3/")
        );
    }

    #[test]
    fn missing_primary_uses_legacy_container() {
        let html = r#"<html><body><div class="novel_view"><p>レガシー段落。</p></div></body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(record.body, "<p>レガシー段落。</p>");
    }

    #[test]
    fn page_without_content_or_links_ends_chain() {
        let html = r#"<html><head><title>メンテナンス中</title></head><body><div>しばらくお待ちください</div></body></html>"#;
        let record = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(record.title, "Episode");
        assert_eq!(record.body, "");
        assert!(record.next_url.is_none());
    }

    #[test]
    fn parse_episode_twice_is_identical() {
        let html = r#"<html><body><h1 class="p-novel__title">T</h1><div class="p-novel__body"><div class="p-novel__text"><p>a</p></div></div>
<a class="c-pager__item--next" href="/n1/3/">次へ</a></body></html>"#;
        let a = NarouExtractor.parse_episode(html, CH2);
        let b = NarouExtractor.parse_episode(html, CH2);
        assert_eq!(a, b);
    }
}

//! Kakuyomu extractor. The work page links straight to the first episode; each episode page carries
//! a "next episode" anchor with a stable id.
//!
//! Work-page markup uses hashed CSS-module class names that change between deploys, so the fixed
//! structural path is tried first and looser selectors after it.

use crate::model::{BookIdentifier, ChapterRecord, Platform};
use crate::scraper::error::ScraperError;
use crate::scraper::heuristics::{
    container_body, first_match, resolve_href, select_first, select_href, select_text, Strategy,
};
use crate::scraper::{strip_title_site_suffix, Extractor};
use scraper::Html;
use tracing::warn;

pub const KAKUYOMU_BASE: &str = "https://kakuyomu.jp";

const WORK_HEADER_PATH: &str = "#app > div.DefaultTemplate_fixed__DLjCr.DefaultTemplate_isWeb__QRPlB.DefaultTemplate_fixedGlobalFooter___dZog > div > div > main > div.NewBox_box__45ont.NewBox_padding-px-4l__Kx_xT.NewBox_padding-pt-7l__Czm59 > div > div.Gap_size-2l__HWqrr.Gap_direction-y__Ee6Qv";
const TITLE_SUFFIXES: &[&str] = &[" - カクヨム", " | カクヨム"];

const PRIMARY_BODY: &str = "#contentMain-inner > div > div > div";
const LEGACY_BODY: &str = ".widget-episodeBody.js-episode-body";
const NEXT_EPISODE: &str = "#contentMain-readNextEpisode";

pub struct KakuyomuExtractor;

fn work_title_fixed_path(doc: &Html) -> Option<String> {
    select_text(
        doc,
        &format!(
            "{} > div.Gap_size-3s__fjxCP.Gap_direction-y__Ee6Qv > h1 > span > a",
            WORK_HEADER_PATH
        ),
    )
}

fn work_title_heading_link(doc: &Html) -> Option<String> {
    select_text(doc, "main h1 a[href*=\"/works/\"]").or_else(|| select_text(doc, "main h1"))
}

fn work_title_og(doc: &Html) -> Option<String> {
    select_first(doc, "meta[property=\"og:title\"]")
        .and_then(|e| e.value().attr("content"))
        .map(|t| strip_title_site_suffix(t, TITLE_SUFFIXES))
        .filter(|t| !t.is_empty())
}

const WORK_TITLE: &[(&str, Strategy<String>)] = &[
    ("fixed path", work_title_fixed_path),
    ("heading link", work_title_heading_link),
    ("og:title", work_title_og),
];

fn first_episode_fixed_path(doc: &Html) -> Option<String> {
    select_href(
        doc,
        &format!(
            "{} > div.Gap_size-m__thYv4.Gap_direction-y__Ee6Qv > div > a",
            WORK_HEADER_PATH
        ),
    )
}

fn first_episode_any_link(doc: &Html) -> Option<String> {
    select_href(doc, "main a[href*=\"/episodes/\"]")
        .or_else(|| select_href(doc, "a[href*=\"/episodes/\"]"))
}

const FIRST_EPISODE: &[(&str, Strategy<String>)] = &[
    ("fixed path", first_episode_fixed_path),
    ("episode link", first_episode_any_link),
];

fn episode_title_widget(doc: &Html) -> Option<String> {
    select_text(doc, ".widget-episodeTitle.js-vertical-composition-item")
        .or_else(|| select_text(doc, ".widget-episodeTitle"))
}

fn episode_title_heading(doc: &Html) -> Option<String> {
    select_text(doc, "h1")
}

const EPISODE_TITLE: &[(&str, Strategy<String>)] = &[
    ("episode title widget", episode_title_widget),
    ("heading", episode_title_heading),
];

fn primary_body(doc: &Html) -> Option<String> {
    container_body(doc, PRIMARY_BODY)
}

fn legacy_body(doc: &Html) -> Option<String> {
    container_body(doc, LEGACY_BODY)
}

const EPISODE_BODY: &[(&str, Strategy<String>)] =
    &[("contentMain-inner", primary_body), ("episode body widget", legacy_body)];

fn next_episode_anchor(doc: &Html) -> Option<String> {
    select_href(doc, NEXT_EPISODE)
}

const NEXT_LINK: &[(&str, Strategy<String>)] = &[("next episode anchor", next_episode_anchor)];

impl Extractor for KakuyomuExtractor {
    fn platform(&self) -> Platform {
        Platform::Kakuyomu
    }

    fn info_url(&self, id: &BookIdentifier) -> String {
        format!("{}/works/{}", KAKUYOMU_BASE, id.book_id)
    }

    fn parse_info(&self, html: &str, info_url: &str) -> Result<(String, String), ScraperError> {
        let doc = Html::parse_document(html);
        let href = first_match(&doc, FIRST_EPISODE).ok_or_else(|| {
            ScraperError::ExtractionFailed {
                message: "Could not find first episode link".to_string(),
            }
        })?;
        let title =
            first_match(&doc, WORK_TITLE).unwrap_or_else(|| "Unknown Title".to_string());
        Ok((title, resolve_href(&href, info_url, KAKUYOMU_BASE)))
    }

    fn parse_episode(&self, html: &str, url: &str) -> ChapterRecord {
        let doc = Html::parse_document(html);
        let title =
            first_match(&doc, EPISODE_TITLE).unwrap_or_else(|| "Unknown Episode".to_string());
        let Some(body) = first_match(&doc, EPISODE_BODY) else {
            warn!(url = %url, "no episode content found");
            return ChapterRecord {
                title,
                body: String::new(),
                next_url: None,
            };
        };
        let next_url =
            first_match(&doc, NEXT_LINK).map(|href| resolve_href(&href, url, KAKUYOMU_BASE));
        ChapterRecord {
            title,
            body,
            next_url,
        }
    }
}

//! Data model for one download session: the resolved identifier, novel info, per-page extraction
//! records, and the ordered chapter list handed to the EPUB writer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported novel-hosting site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Kakuyomu,
    Narou,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Kakuyomu => write!(f, "kakuyomu"),
            Platform::Narou => write!(f, "narou"),
        }
    }
}

/// Syosetu serves general and adult works from different hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarouDomain {
    Plain,
    Adult,
}

impl NarouDomain {
    pub fn host(self) -> &'static str {
        match self {
            NarouDomain::Plain => "ncode.syosetu.com",
            NarouDomain::Adult => "novel18.syosetu.com",
        }
    }

    pub fn from_host(host: &str) -> Option<Self> {
        match host {
            "ncode.syosetu.com" => Some(NarouDomain::Plain),
            "novel18.syosetu.com" => Some(NarouDomain::Adult),
            _ => None,
        }
    }
}

/// Resolved user input. Created once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookIdentifier {
    pub platform: Platform,
    pub book_id: String,
    /// Only set for Syosetu.
    pub domain: Option<NarouDomain>,
}

/// Result of the info step. `user_agent` stays fixed for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelInfo {
    pub title: String,
    pub first_chapter_url: String,
    pub user_agent: String,
}

/// One extracted page. `body` only ever holds `<p>` elements and `<br/>`.
/// An empty body marks the end of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRecord {
    pub title: String,
    #[serde(rename = "bodyMarkup")]
    pub body: String,
    pub next_url: Option<String>,
}

impl ChapterRecord {
    pub fn is_end(&self) -> bool {
        self.body.is_empty()
    }
}

/// The chapter list in reading order plus book metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    #[serde(rename = "bookId")]
    pub book_id: String,
    pub chapters: Vec<Chapter>,
}

/// One chapter in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// `chapter_<n>.xhtml`, numbered from 1.
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub body: String,
}

impl Book {
    pub fn new(title: impl Into<String>, book_id: impl Into<String>) -> Self {
        Book {
            title: title.into(),
            book_id: book_id.into(),
            chapters: Vec::new(),
        }
    }

    /// Append a chapter; its file name follows from its position.
    pub fn push_chapter(&mut self, title: String, body: String) -> &Chapter {
        let n = self.chapters.len() + 1;
        self.chapters.push(Chapter {
            title,
            file_name: format!("chapter_{}.xhtml", n),
            body,
        });
        &self.chapters[n - 1]
    }
}

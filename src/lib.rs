//! chapterchain: downloads Kakuyomu and Syosetu web novels by walking the next-episode chain,
//! with a relay fallback when the site blocks direct requests, and writes EPUB.

pub mod api;
pub mod cli;
pub mod config;
pub mod epub;
pub mod model;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use api::{handle_request, DownloadRequest, DownloadResponse};
pub use epub::{assemble, write_epub, EpubError};
pub use model::{Book, BookIdentifier, Chapter, ChapterRecord, NarouDomain, NovelInfo, Platform};
pub use scraper::{
    download_novel, extractor_for, resolve_identifier, DownloadOutcome, Extractor, HttpClient,
    HttpClientBuilder, ScraperError, Transport, TraversalState,
};

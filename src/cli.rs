//! CLI parsing and orchestration. Parses args, runs resolve -> info -> chapter chain -> EPUB, or
//! answers a single JSON request. Maps errors to exit codes.

use crate::api::{handle_request, DownloadRequest};
use crate::config::{self, Config};
use crate::epub::{write_epub, EpubError};
use crate::model::Platform;
use crate::scraper::{
    download_novel, pick_user_agent, resolve_identifier_as, HttpClient, Progress, ScraperError,
    TraversalState, DEFAULT_USER_AGENTS,
};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Epub(#[from] EpubError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(ScraperError::InvalidIdentifier { .. })
            | CliRunError::Scraper(ScraperError::InvalidRequest { .. }) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Epub(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chapterchain")]
#[command(about = "Download Kakuyomu or Syosetu web novels by following the next-episode chain, and write EPUB")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, user_agents, timeout_secs) are read from ./chapterchain.toml or $XDG_CONFIG_HOME/chapterchain/config.toml. CLI flags override config. RUST_LOG overrides the log level."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging and the full error chain.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a whole novel and write it as EPUB.
    Download(DownloadArgs),
    /// Read one JSON request record from stdin and write the JSON response to stdout.
    Request(NetArgs),
    /// Print the platform, book id and domain an input resolves to.
    Resolve {
        /// Work URL, chapter URL, or bare book id.
        input: String,

        /// Override platform detection (kakuyomu or narou).
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Work URL, chapter URL, or bare book id (Kakuyomu work id or Syosetu ncode).
    pub input: String,

    /// Output path. Default: {output_dir}/{sanitized-title}.epub.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override platform detection (kakuyomu or narou).
    #[arg(long, value_parser = parse_platform)]
    pub platform: Option<Platform>,

    #[command(flatten)]
    pub net: NetArgs,
}

#[derive(clap::Args, Debug, Default)]
pub struct NetArgs {
    /// HTTP User-Agent for the whole session (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    match s.to_lowercase().as_str() {
        "kakuyomu" | "k" => Ok(Platform::Kakuyomu),
        "narou" | "syosetu" | "n" => Ok(Platform::Narou),
        _ => Err(format!(
            "Invalid --platform value: '{}'. Use 'kakuyomu' or 'narou'.",
            s
        )),
    }
}

/// Sanitize book title to a safe filename: lowercase, replace spaces/special with `-`.
/// Non-ASCII letters (kana, kanji) are kept.
fn sanitize_title(title: &str) -> String {
    let mut s = title
        .chars()
        .flat_map(|c| {
            let keep: Vec<char> = if c.is_alphanumeric() {
                c.to_lowercase().collect()
            } else {
                vec!['-']
            };
            keep
        })
        .collect::<String>();
    // Collapse multiple dashes and trim
    while s.contains("--") {
        s = s.replace("--", "-");
    }
    s = s.trim_matches('-').to_string();
    if s.is_empty() {
        s = "book".to_string();
    }
    s
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// `{output_dir}/{sanitized-title}.epub`, checked like an explicit `-o` path.
fn default_output_path(output_dir: &Path, title: &str) -> Result<PathBuf, CliRunError> {
    let path = output_dir.join(format!("{}.epub", sanitize_title(title)));
    validate_output_path(&path)?;
    Ok(path)
}

/// Session user agent: flag, then config `user_agent`, then a sample from config `user_agents`,
/// then a sample from the built-in list.
fn session_user_agent(flag: Option<&str>, config: Option<&Config>) -> String {
    if let Some(ua) = flag.filter(|s| !s.is_empty()) {
        return ua.to_string();
    }
    if let Some(ua) = config.and_then(|c| c.user_agent.as_deref()) {
        return ua.to_string();
    }
    match config.and_then(|c| c.user_agents.as_deref()) {
        Some(pool) if !pool.is_empty() => pick_user_agent(pool),
        _ => pick_user_agent(DEFAULT_USER_AGENTS),
    }
}

fn build_client(net: &NetArgs, config: Option<&Config>) -> Result<HttpClient, CliRunError> {
    let timeout_secs = net
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    HttpClient::builder()
        .timeout_secs(timeout_secs)
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn spinner() -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new_spinner();
    let style = indicatif::ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    match &args.command {
        Command::Download(dl) => run_download(dl, args.quiet),
        Command::Request(net) => run_request(net),
        Command::Resolve { input, platform } => {
            let id = resolve_identifier_as(input, *platform)?;
            println!("platform: {}", id.platform);
            println!("book id:  {}", id.book_id);
            if let Some(domain) = id.domain {
                println!("domain:   {}", domain.host());
            }
            Ok(())
        }
    }
}

fn run_download(dl: &DownloadArgs, quiet: bool) -> Result<(), CliRunError> {
    let id = resolve_identifier_as(&dl.input, dl.platform)?;
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let effective_output_dir: PathBuf = config
        .as_ref()
        .and_then(|c| c.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    if let Some(p) = &dl.output {
        validate_output_path(p)?;
    }

    let user_agent = session_user_agent(dl.net.user_agent.as_deref(), config.as_ref());
    let mut client = build_client(&dl.net, config.as_ref())?;

    let bar = if quiet { None } else { Some(spinner()) };
    let mut on_progress = |p: Progress<'_>| {
        let Some(bar) = &bar else { return };
        match p {
            Progress::FetchingInfo => bar.set_message("Fetching novel info..."),
            Progress::Found { title } => bar.set_message(format!("Found novel: {}", title)),
            Progress::Episode(n) => bar.set_message(format!("Downloading episode {}...", n)),
        }
    };
    let result = download_novel(&mut client, &id, &user_agent, &mut on_progress);
    if let Some(bar) = &bar {
        bar.disable_steady_tick();
        bar.finish_and_clear();
    }
    let outcome = result?;

    if let Some(stop) = &outcome.stopped {
        warn!(error = %stop, "packaging the episodes gathered before the stop");
    }

    let output_path = match &dl.output {
        Some(p) => p.clone(),
        None => default_output_path(&effective_output_dir, &outcome.book.title)?,
    };
    write_epub(&outcome.book, &output_path)?;

    if !quiet {
        eprintln!("{}", outcome.status);
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}

fn run_request(net: &NetArgs) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| CliRunError::InvalidInput(format!("Cannot read request from stdin: {}", e)))?;
    let mut request: DownloadRequest = serde_json::from_str(&input)
        .map_err(|e| CliRunError::InvalidInput(format!("Invalid request JSON: {}", e)))?;
    if request.user_agent.as_deref().map_or(true, str::is_empty) {
        request.user_agent = Some(session_user_agent(
            net.user_agent.as_deref(),
            config.as_ref(),
        ));
    }

    let mut client = build_client(net, config.as_ref())?;
    let mut state = TraversalState::new();
    let response = handle_request(&mut state, &mut client, &request);
    let json = serde_json::to_string(&response)
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to encode response: {}", e)))?;
    println!("{}", json);
    Ok(())
}

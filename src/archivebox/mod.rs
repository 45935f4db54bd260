//! Interface to the containerized ArchiveBox tool.
//!
//! ArchiveBox is only reachable through `docker compose run`. Its console log
//! and the `index.json` files it writes are the only outputs we consume.

pub mod compose;
pub mod index;
pub mod log_parser;
pub mod provision;

pub use compose::{ArchiveBoxCli, DockerCompose};
pub use index::{read_index, ExtractorRun, NormalizedIndex};
pub use log_parser::{
    archive_locations, classify_blocks, classify_log, find_blocks, parse_archive_paths,
    remove_protocol, ArchiveLocation, LinkOutcome, LinkStatus, LogBlock, LogClassification,
    OverallStatus,
};

use serde::{Deserialize, Serialize};

/// Extractor used as the reachability probe for a URL.
pub const HEADERS_EXTRACTOR: &str = "headers";

/// Capture methods understood by `archivebox add --extract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extractor {
    Title,
    Screenshot,
    Git,
    Favicon,
    Headers,
    Singlefile,
    Pdf,
    Dom,
    Wget,
    Readability,
    Mercury,
    Htmltotext,
    Media,
    ArchiveOrg,
}

impl Extractor {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Screenshot => "screenshot",
            Self::Git => "git",
            Self::Favicon => "favicon",
            Self::Headers => "headers",
            Self::Singlefile => "singlefile",
            Self::Pdf => "pdf",
            Self::Dom => "dom",
            Self::Wget => "wget",
            Self::Readability => "readability",
            Self::Mercury => "mercury",
            Self::Htmltotext => "htmltotext",
            Self::Media => "media",
            Self::ArchiveOrg => "archive_org",
        }
    }
}

/// Input parsers understood by `archivebox add --parser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputParser {
    #[default]
    Auto,
    PocketApi,
    ReadwiseReaderApi,
    WallabagAtom,
    PocketHtml,
    PinboardRss,
    ShaarliRss,
    MediumRss,
    NetscapeHtml,
    Rss,
    Json,
    Jsonl,
    Html,
    Txt,
    UrlList,
}

impl InputParser {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::PocketApi => "pocket_api",
            Self::ReadwiseReaderApi => "readwise_reader_api",
            Self::WallabagAtom => "wallabag_atom",
            Self::PocketHtml => "pocket_html",
            Self::PinboardRss => "pinboard_rss",
            Self::ShaarliRss => "shaarli_rss",
            Self::MediumRss => "medium_rss",
            Self::NetscapeHtml => "netscape_html",
            Self::Rss => "rss",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Html => "html",
            Self::Txt => "txt",
            Self::UrlList => "url_list",
        }
    }
}

/// Options for a single `archivebox add` invocation.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub urls: Vec<String>,
    pub tags: Vec<String>,
    pub depth: u8,
    pub update: bool,
    pub update_all: bool,
    pub overwrite: bool,
    pub extractors: Vec<Extractor>,
    pub parser: Option<InputParser>,
}

impl AddOptions {
    /// Build the `add` argument vector.
    ///
    /// Flag order is fixed. When any extractor is requested, `headers` is
    /// appended if missing so reachability can always be judged.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["add".to_string()];
        args.extend(self.urls.iter().cloned());

        if !self.tags.is_empty() {
            args.push(format!("--tag={}", self.tags.join(",")));
        }
        args.push(format!("--depth={}", self.depth));
        if self.update {
            args.push("--update".to_string());
        }
        if self.update_all {
            args.push("--update-all".to_string());
        }
        if self.overwrite {
            args.push("--overwrite".to_string());
        }
        if !self.extractors.is_empty() {
            let mut names: Vec<&str> = self.extractors.iter().map(Extractor::as_str).collect();
            if !names.contains(&HEADERS_EXTRACTOR) {
                names.push(HEADERS_EXTRACTOR);
            }
            args.push(format!("--extract={}", names.join(",")));
        }
        if let Some(parser) = self.parser {
            args.push(format!("--parser={}", parser.as_str()));
        }

        args
    }
}

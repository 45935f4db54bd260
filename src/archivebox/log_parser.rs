//! Scanner for the ArchiveBox `add` console log.
//!
//! For every snapshot it archives, ArchiveBox prints a block like:
//!
//! ```text
//! [+] [2024-07-04 06:16:09] "www.baidu.com"
//!     https://www.baidu.com/
//!     > ./archive/1720073769.137125
//!       > screenshot
//! ```
//!
//! The quoted label is the URL without scheme or trailing slash. Blocks are
//! not printed in input order, so each requested URL is located by its label.
//! A block runs until the next line starting with `[` or the end of the log.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};

static ARCHIVE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"> (\./archive/\S+)").unwrap());

static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());

/// Marker ArchiveBox prints under an extractor that errored.
const EXTRACTOR_FAILED: &str = "Extractor failed";

/// Where ArchiveBox stored a requested URL, if the log says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveLocation {
    pub url: String,
    pub archive_path: Option<String>,
}

/// Coarse outcome of one URL's log block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkOutcome {
    Success,
    Failure,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub url: String,
    pub status: LinkOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallStatus {
    Success,
    Failure,
    #[serde(rename = "Partial Success")]
    PartialSuccess,
}

impl OverallStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::PartialSuccess => "Partial Success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogClassification {
    pub status: OverallStatus,
    pub links: Vec<LinkStatus>,
}

/// Strip one leading `http://` or `https://` and a single trailing `/`.
#[must_use]
pub fn remove_protocol(url: &str) -> String {
    let stripped = SCHEME.replace(url, "");
    stripped
        .strip_suffix('/')
        .unwrap_or(&*stripped)
        .to_string()
}

/// A requested URL paired with its log block, if the log has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogBlock<'a> {
    pub url: &'a str,
    pub segment: Option<&'a str>,
}

/// Locate each requested URL's block in `log_text`, in request order.
#[must_use]
pub fn find_blocks<'a>(log_text: &'a str, urls: &'a [String]) -> Vec<LogBlock<'a>> {
    urls.iter()
        .map(|url| LogBlock {
            url,
            segment: find_segment(log_text, url),
        })
        .collect()
}

fn find_segment<'a>(log_text: &'a str, url: &str) -> Option<&'a str> {
    let label = regex::escape(&remove_protocol(url));
    let header = match Regex::new(&format!(r#"\[\+\] .*?"{label}"\s+https?://\S+"#)) {
        Ok(re) => re,
        Err(e) => {
            debug!(url = %url, error = %e, "Failed to build log block pattern");
            return None;
        }
    };
    let start = header.find(log_text)?.start();
    let end = log_text[start..]
        .find("\n[")
        .map_or(log_text.len(), |offset| start + offset);
    Some(&log_text[start..end])
}

/// Archive directory named in each block.
///
/// # Errors
///
/// Returns `AlreadyExists` when no block has an archive path, which is how
/// ArchiveBox reports that every URL was already indexed.
pub fn archive_locations(blocks: &[LogBlock<'_>]) -> ArchiveResult<Vec<ArchiveLocation>> {
    let locations: Vec<ArchiveLocation> = blocks
        .iter()
        .map(|block| ArchiveLocation {
            url: block.url.to_string(),
            archive_path: block.segment.and_then(|segment| {
                ARCHIVE_PATH
                    .captures(segment)
                    .map(|caps| caps[1].to_string())
            }),
        })
        .collect();

    if locations.iter().all(|l| l.archive_path.is_none()) {
        return Err(ArchiveError::AlreadyExists);
    }

    Ok(locations)
}

/// Map each requested URL to the archive directory named in its log block.
///
/// # Errors
///
/// Returns `AlreadyExists` when no URL has an archive path.
pub fn parse_archive_paths(log_text: &str, urls: &[String]) -> ArchiveResult<Vec<ArchiveLocation>> {
    archive_locations(&find_blocks(log_text, urls))
}

/// Judge each block as success or failure from its text alone.
#[must_use]
pub fn classify_blocks(blocks: &[LogBlock<'_>]) -> LogClassification {
    let links: Vec<LinkStatus> = blocks
        .iter()
        .map(|block| {
            let status = match block.segment {
                Some(segment) if segment.contains(EXTRACTOR_FAILED) => LinkOutcome::Failure,
                Some(_) => LinkOutcome::Success,
                None => LinkOutcome::Unknown,
            };
            LinkStatus {
                url: block.url.to_string(),
                status,
            }
        })
        .collect();

    let status = if links.iter().all(|l| l.status == LinkOutcome::Success) {
        OverallStatus::Success
    } else if links.iter().all(|l| l.status == LinkOutcome::Failure) {
        OverallStatus::Failure
    } else {
        OverallStatus::PartialSuccess
    };

    LogClassification { status, links }
}

/// Classify each URL's block as success or failure from the log text alone.
#[must_use]
pub fn classify_log(log_text: &str, urls: &[String]) -> LogClassification {
    classify_blocks(&find_blocks(log_text, urls))
}

//! Reader for the per-snapshot `index.json` that ArchiveBox writes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};

/// Display format for capture window timestamps.
pub const DISPLAY_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Status string ArchiveBox writes for a successful extractor run.
const SUCCEEDED: &str = "succeeded";

#[derive(Debug, Deserialize)]
struct RawIndex {
    url: Option<String>,
    timestamp: Option<Value>,
    history: HashMap<String, Vec<RawRun>>,
}

#[derive(Debug, Deserialize)]
struct RawRun {
    start_ts: Option<String>,
    end_ts: Option<String>,
    status: Option<String>,
    output: Option<Value>,
}

/// The most recent run of one extractor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractorRun {
    pub start_ts: Option<String>,
    pub end_ts: Option<String>,
    pub status: bool,
    pub output: Option<String>,
}

/// A snapshot's index reduced to what we persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedIndex {
    pub url: String,
    pub timestamp: f64,
    pub history: BTreeMap<String, ExtractorRun>,
}

impl NormalizedIndex {
    /// Whether the headers probe ran and succeeded.
    #[must_use]
    pub fn headers_succeeded(&self) -> bool {
        self.history
            .get(super::HEADERS_EXTRACTOR)
            .is_some_and(|run| run.status)
    }
}

/// Read and normalize an `index.json` file.
///
/// Timestamps are shifted to the fixed display offset `utc_offset_hours`.
///
/// # Errors
///
/// Returns `IndexMissing` if the file cannot be read and `MalformedIndex` if
/// its contents do not have the expected shape.
pub async fn read_index(path: &Path, utc_offset_hours: i32) -> ArchiveResult<NormalizedIndex> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArchiveError::IndexMissing(path.to_path_buf())
        } else {
            malformed(path, format!("failed to read: {e}"))
        }
    })?;
    parse_index(&content, utc_offset_hours).map_err(|message| malformed(path, message))
}

fn malformed(path: &Path, message: String) -> ArchiveError {
    ArchiveError::MalformedIndex {
        path: path.to_path_buf(),
        message,
    }
}

/// Normalize raw `index.json` text.
///
/// # Errors
///
/// Returns a description of the first structural problem found.
pub fn parse_index(content: &str, utc_offset_hours: i32) -> Result<NormalizedIndex, String> {
    let raw: RawIndex = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .ok_or_else(|| format!("invalid utc offset: {utc_offset_hours}"))?;

    let url = raw.url.ok_or("missing url")?;
    let timestamp = raw
        .timestamp
        .as_ref()
        .and_then(parse_timestamp)
        .ok_or("missing or invalid timestamp")?;

    let mut history = BTreeMap::new();
    for (extractor, runs) in raw.history {
        let Some(latest) = runs.into_iter().next() else {
            debug!(extractor = %extractor, "Skipping extractor with empty history");
            continue;
        };
        let run = ExtractorRun {
            start_ts: latest
                .start_ts
                .as_deref()
                .map(|ts| to_display(ts, offset))
                .transpose()?,
            end_ts: latest
                .end_ts
                .as_deref()
                .map(|ts| to_display(ts, offset))
                .transpose()?,
            status: latest.status.as_deref() == Some(SUCCEEDED),
            output: match latest.output {
                Some(Value::String(s)) if !s.is_empty() => Some(s),
                _ => None,
            },
        };
        history.insert(extractor, run);
    }

    Ok(NormalizedIndex {
        url,
        timestamp,
        history,
    })
}

/// ArchiveBox writes the snapshot timestamp as a string like `"1720073769.137125"`.
fn parse_timestamp(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Convert an ISO-8601 timestamp to the display offset and format.
///
/// Values without an explicit offset are taken as UTC.
fn to_display(ts: &str, offset: FixedOffset) -> Result<String, String> {
    let utc = match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {ts:?}: {e}"))?,
    };
    Ok(utc.with_timezone(&offset).format(DISPLAY_TS_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "url": "https://www.baidu.com/",
        "timestamp": "1720073769.137125",
        "title": "百度一下，你就知道",
        "history": {
            "headers": [
                {
                    "start_ts": "2024-07-04T06:16:09.500000+00:00",
                    "end_ts": "2024-07-04T06:16:10.250000+00:00",
                    "status": "succeeded",
                    "output": "headers.json"
                }
            ],
            "screenshot": [
                {
                    "start_ts": "2024-07-04T06:16:10.300000+00:00",
                    "end_ts": "2024-07-04T06:16:13.000000+00:00",
                    "status": "failed",
                    "output": null
                },
                {
                    "start_ts": "2024-07-01T00:00:00+00:00",
                    "end_ts": "2024-07-01T00:00:01+00:00",
                    "status": "succeeded",
                    "output": "screenshot.png"
                }
            ],
            "pdf": []
        }
    }"#;

    #[test]
    fn test_parse_index() {
        let index = parse_index(INDEX, 8).unwrap();
        assert_eq!(index.url, "https://www.baidu.com/");
        assert!((index.timestamp - 1_720_073_769.137_125).abs() < 1e-6);
        assert_eq!(index.history.len(), 2);

        let headers = &index.history["headers"];
        assert!(headers.status);
        assert_eq!(headers.output.as_deref(), Some("headers.json"));
        assert_eq!(headers.start_ts.as_deref(), Some("2024-07-04 14:16:09.500000"));
        assert_eq!(headers.end_ts.as_deref(), Some("2024-07-04 14:16:10.250000"));

        // Only the first listed run counts.
        let screenshot = &index.history["screenshot"];
        assert!(!screenshot.status);
        assert_eq!(screenshot.output, None);
        assert!(index.headers_succeeded());
    }

    #[test]
    fn test_missing_timestamps_pass_through() {
        let json = r#"{"url": "https://a.example", "timestamp": 1.5,
            "history": {"title": [{"status": "succeeded", "output": "title"}]}}"#;
        let index = parse_index(json, 8).unwrap();
        let title = &index.history["title"];
        assert_eq!(title.start_ts, None);
        assert_eq!(title.end_ts, None);
        assert!(!index.headers_succeeded());
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            to_display("2024-07-04T06:16:09.5", offset).unwrap(),
            "2024-07-04 06:16:09.500000"
        );
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(parse_index("not json", 8).is_err());
        assert!(parse_index(r#"{"url": "https://a.example", "timestamp": "1"}"#, 8).is_err());
        assert!(parse_index(
            r#"{"url": "https://a.example", "timestamp": "1", "history": []}"#,
            8
        )
        .is_err());
        assert!(parse_index(r#"{"timestamp": "1", "history": {}}"#, 8).is_err());
    }

    #[tokio::test]
    async fn test_read_index_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("index.json");
        assert!(matches!(
            read_index(&missing, 8).await,
            Err(ArchiveError::IndexMissing(_))
        ));

        tokio::fs::write(&missing, "{").await.unwrap();
        assert!(matches!(
            read_index(&missing, 8).await,
            Err(ArchiveError::MalformedIndex { .. })
        ));
    }
}

//! Request orchestration: run ArchiveBox, read what it wrote, record it.

pub mod static_paths;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archivebox::{
    archive_locations, classify_blocks, find_blocks, provision, read_index, AddOptions,
    ArchiveBoxCli, NormalizedIndex,
};
use crate::config::Config;
use crate::db::{filter_targets, save_index, tag_target, Database, TargetFilter, TargetView};
use crate::error::{ArchiveError, ArchiveResult};

pub use static_paths::{clean_path, static_url};

/// Static URLs per extractor for one archived URL.
pub type ExtractorPaths = BTreeMap<String, String>;

/// Why a single URL in a batch was marked failed.
#[derive(Debug, Error)]
enum UrlFailure {
    #[error("no log block names this url")]
    LogUnmatched,
    #[error(transparent)]
    Index(#[from] ArchiveError),
    #[error("failed to persist results: {0:#}")]
    Storage(anyhow::Error),
    #[error("headers extractor did not succeed")]
    Unreachable,
    #[error("no extractor produced output")]
    NoOutput,
}

/// Per-URL verdicts of one `add` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    /// Succeeded URLs with their static asset URLs.
    pub archive_paths: BTreeMap<String, ExtractorPaths>,
    /// Failed URLs, in request order.
    pub failed_urls: Vec<String>,
}

/// Result of backfilling the store from the archive directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synchronized: usize,
    /// Snapshot directories whose index could not be read or stored.
    pub failed: Vec<String>,
}

/// Drives ArchiveBox and records its results.
#[derive(Clone)]
pub struct ArchiveService {
    config: Arc<Config>,
    db: Database,
    cli: Arc<dyn ArchiveBoxCli>,
}

impl ArchiveService {
    #[must_use]
    pub fn new(config: Arc<Config>, db: Database, cli: Arc<dyn ArchiveBoxCli>) -> Self {
        Self { config, db, cli }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    /// Provision the compose project and start the ArchiveBox server.
    ///
    /// # Errors
    ///
    /// Returns the first failing bootstrap step.
    pub async fn initialize(&self) -> ArchiveResult<String> {
        provision::initialize(&self.config, self.cli.as_ref()).await
    }

    /// Archive a batch of URLs and record what ArchiveBox produced.
    ///
    /// Per-URL problems only fail that URL.
    ///
    /// # Errors
    ///
    /// Returns an error if ArchiveBox cannot be run, or `AlreadyExists` if its
    /// log names no archive directory for any URL.
    pub async fn add_urls(&self, options: &AddOptions) -> ArchiveResult<AddOutcome> {
        let args = options.to_args();
        info!(urls = options.urls.len(), command = %args.join(" "), "Archiving URLs");

        let log_text = self.cli.run(&args).await?;

        let blocks = find_blocks(&log_text, &options.urls);
        let classification = classify_blocks(&blocks);
        debug!(status = classification.status.as_str(), "ArchiveBox log classification");

        let locations = archive_locations(&blocks)?;

        let mut outcome = AddOutcome::default();
        for location in locations {
            let result = match &location.archive_path {
                Some(archive_path) => self.process_url(archive_path, &options.tags).await,
                None => Err(UrlFailure::LogUnmatched),
            };

            match result {
                Ok(paths) => {
                    info!(url = %location.url, extractors = paths.len(), "URL archived");
                    outcome.archive_paths.insert(location.url, paths);
                }
                Err(reason) => {
                    warn!(url = %location.url, reason = %reason, "URL failed");
                    if !outcome.failed_urls.contains(&location.url) {
                        outcome.failed_urls.push(location.url);
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn process_url(
        &self,
        archive_path: &str,
        tags: &[String],
    ) -> Result<ExtractorPaths, UrlFailure> {
        let index_path = self
            .config
            .data_dir
            .join(archive_path)
            .join("index.json");
        if !tokio::fs::try_exists(&index_path).await.unwrap_or(false) {
            return Err(ArchiveError::IndexMissing(index_path).into());
        }

        let index = read_index(&index_path, self.config.display_utc_offset_hours).await?;
        let target = save_index(self.db.pool(), &index)
            .await
            .map_err(UrlFailure::Storage)?;
        if !tags.is_empty() {
            tag_target(self.db.pool(), &target.url, tags)
                .await
                .map_err(UrlFailure::Storage)?;
        }

        if !index.headers_succeeded() {
            return Err(UrlFailure::Unreachable);
        }
        let paths = self.extractor_paths(&index, archive_path);
        if paths.is_empty() {
            return Err(UrlFailure::NoOutput);
        }
        Ok(paths)
    }

    fn extractor_paths(&self, index: &NormalizedIndex, archive_path: &str) -> ExtractorPaths {
        index
            .history
            .iter()
            .filter(|(_, run)| run.status)
            .filter_map(|(extractor, run)| {
                run.output.as_deref().map(|output| {
                    (
                        extractor.clone(),
                        static_url(&self.config.static_url_prefix, archive_path, output),
                    )
                })
            })
            .collect()
    }

    /// Record every snapshot under the archive directory.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the archive directory is missing.
    pub async fn synchronize(&self) -> ArchiveResult<SyncReport> {
        let archive_root = self.archive_root()?;
        let snapshot_dirs = list_snapshot_dirs(&archive_root).await?;
        info!(root = %archive_root.display(), snapshots = snapshot_dirs.len(), "Synchronizing archive");

        let mut report = SyncReport::default();
        for dir in snapshot_dirs {
            let index_path = dir.join("index.json");
            if !tokio::fs::try_exists(&index_path).await.unwrap_or(false) {
                continue;
            }
            let name = dir
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());

            let index = match read_index(&index_path, self.config.display_utc_offset_hours).await {
                Ok(index) => index,
                Err(e) => {
                    warn!(dir = %name, error = %e, "Skipping unreadable index");
                    report.failed.push(name);
                    continue;
                }
            };
            match save_index(self.db.pool(), &index).await {
                Ok(_) => report.synchronized += 1,
                Err(e) => {
                    warn!(dir = %name, error = %e, "Failed to store index");
                    report.failed.push(name);
                }
            }
        }

        info!(
            synchronized = report.synchronized,
            failed = report.failed.len(),
            "Synchronization complete"
        );
        Ok(report)
    }

    fn archive_root(&self) -> ArchiveResult<PathBuf> {
        let data_dir = &self.config.data_dir;
        if data_dir.as_os_str().is_empty() || !data_dir.is_dir() {
            return Err(ArchiveError::Configuration(format!(
                "archive data directory does not exist: {}",
                data_dir.display()
            )));
        }
        let root = data_dir.join("archive");
        if !root.is_dir() {
            return Err(ArchiveError::Configuration(format!(
                "archive directory does not exist: {}",
                root.display()
            )));
        }
        Ok(root)
    }

    /// List recorded targets matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_targets(&self, filter: &TargetFilter) -> anyhow::Result<Vec<TargetView>> {
        filter_targets(self.db.pool(), filter).await
    }
}

/// Snapshot directories under `root`, sorted by name.
async fn list_snapshot_dirs(root: &Path) -> ArchiveResult<Vec<PathBuf>> {
    let read_failed = |e: std::io::Error| {
        ArchiveError::Configuration(format!("failed to read {}: {e}", root.display()))
    };

    let mut entries = tokio::fs::read_dir(root).await.map_err(read_failed)?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        if entry.file_type().await.map_err(read_failed)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use archivebox_api::archivebox::{remove_protocol, ArchiveBoxCli};
use archivebox_api::archiver::ArchiveService;
use archivebox_api::config::Config;
use archivebox_api::db::Database;
use archivebox_api::error::{ArchiveError, ArchiveResult};
use async_trait::async_trait;
use tempfile::TempDir;

/// Stand-in for the containerized tool: replays a canned log.
pub struct FakeCli {
    reply: Result<String, String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCli {
    pub fn with_log(log: impl Into<String>) -> Self {
        Self {
            reply: Ok(log.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            reply: Err(stderr.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveBoxCli for FakeCli {
    async fn run(&self, args: &[String]) -> ArchiveResult<String> {
        self.calls.lock().unwrap().push(args.to_vec());
        match &self.reply {
            Ok(log) => Ok(log.clone()),
            Err(stderr) => Err(ArchiveError::Invocation {
                command: format!("docker compose run --rm archivebox {}", args.join(" ")),
                message: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
        }
    }

    async fn up(&self) -> ArchiveResult<()> {
        Ok(())
    }
}

/// A project directory with `data/archive` created and an empty database.
pub struct Harness {
    pub dir: TempDir,
    pub config: Config,
    pub db: Database,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config::for_project(dir.path());
        std::fs::create_dir_all(config.data_dir.join("archive")).unwrap();
        let db = Database::new(&config.database_path)
            .await
            .expect("Failed to create database");
        Self { dir, config, db }
    }

    pub fn service(&self, cli: Arc<FakeCli>) -> ArchiveService {
        ArchiveService::new(Arc::new(self.config.clone()), self.db.clone(), cli)
    }

    pub fn archive_dir(&self) -> std::path::PathBuf {
        self.config.data_dir.join("archive")
    }
}

/// One extractor run written into a fixture index.
pub struct Run<'a> {
    pub extractor: &'a str,
    pub succeeded: bool,
    pub output: Option<&'a str>,
}

pub const fn ok<'a>(extractor: &'a str, output: &'a str) -> Run<'a> {
    Run {
        extractor,
        succeeded: true,
        output: Some(output),
    }
}

pub const fn failed(extractor: &str) -> Run<'_> {
    Run {
        extractor,
        succeeded: false,
        output: None,
    }
}

/// Write `archive/<timestamp>/index.json` under `archive_dir`.
pub fn write_index(archive_dir: &Path, timestamp: &str, url: &str, runs: &[Run<'_>]) {
    let mut history = serde_json::Map::new();
    for run in runs {
        history.insert(
            run.extractor.to_string(),
            serde_json::json!([{
                "start_ts": "2024-07-04T06:16:09.500000+00:00",
                "end_ts": "2024-07-04T06:16:10.250000+00:00",
                "status": if run.succeeded { "succeeded" } else { "failed" },
                "output": run.output,
            }]),
        );
    }
    let index = serde_json::json!({
        "url": url,
        "timestamp": timestamp,
        "history": history,
    });

    let dir = archive_dir.join(timestamp);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.json"), index.to_string()).unwrap();
}

/// A console log with one snapshot block per `(url, timestamp)` pair.
pub fn add_log(snapshots: &[(&str, &str)]) -> String {
    let mut log = format!(
        "[▶] [2024-07-04 06:16:09] Starting archiving of {} snapshots in index...\n",
        snapshots.len()
    );
    for (url, timestamp) in snapshots {
        log.push_str(&format!(
            "\n[+] [2024-07-04 06:16:09] \"{}\"\n    {url}\n    > ./archive/{timestamp}\n      > headers\n        2 files (12.0 KB) in 0:00:02s\n",
            remove_protocol(url)
        ));
    }
    log.push_str("\n[√] [2024-07-04 06:16:13] Update of pages complete (4.22 sec)\n");
    log
}

/// A console log for a run where every URL was already archived.
pub fn already_archived_log() -> String {
    "[i] [2024-07-04 06:30:00] ArchiveBox v0.7.2: archivebox add https://www.baidu.com/\n\
     [+] [2024-07-04 06:30:01] Adding 1 links to index (crawl depth=0)...\n    \
     > Found 0 new URLs not already in index\n\
     [*] [2024-07-04 06:30:01] Writing 0 links to main index...\n"
        .to_string()
}

//! ArchiveBox API.
//!
//! A REST facade over a containerized ArchiveBox: it runs the tool, parses
//! its logs and per-snapshot indexes, and keeps a queryable record of
//! archived targets, extractor results, and tags.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod archivebox;
pub mod archiver;
pub mod config;
pub mod db;
pub mod error;
pub mod web;

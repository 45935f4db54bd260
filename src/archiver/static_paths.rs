//! Rewriting of ArchiveBox output paths into static-asset URLs.

/// Normalize a relative path: unify separators, drop `.` and empty segments,
/// and resolve `..` without ever climbing above the root.
#[must_use]
pub fn clean_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// URL under `prefix` for an extractor `output` inside `archive_path`.
#[must_use]
pub fn static_url(prefix: &str, archive_path: &str, output: &str) -> String {
    let joined = format!("{archive_path}/{output}");
    format!("{}/{}", prefix.trim_end_matches('/'), clean_path(&joined))
}

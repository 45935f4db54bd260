use anyhow::{Context, Result};
use sqlx::SqlitePool;
use url::Url;

use super::models::{ExtractorResult, Tag, Target, TargetFilter, TargetView};
use crate::archivebox::NormalizedIndex;
use crate::error::ArchiveError;

/// Host (and port, if any) of a URL; empty when it does not parse.
#[must_use]
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str().map(|host| match u.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
        })
        .unwrap_or_default()
}

/// `?, ?, ?` for an `IN (...)` clause.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ========== Targets ==========

/// Get a target by its URL.
pub async fn get_target_by_url(pool: &SqlitePool, url: &str) -> Result<Option<Target>> {
    sqlx::query_as("SELECT * FROM targets WHERE url = ?")
        .bind(url)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch target by url")
}

/// Get or create the target for `url`.
///
/// Domain and timestamp are only written when the row is created.
pub async fn get_or_create_target(pool: &SqlitePool, url: &str, timestamp: f64) -> Result<Target> {
    sqlx::query("INSERT OR IGNORE INTO targets (url, domain, timestamp) VALUES (?, ?, ?)")
        .bind(url)
        .bind(domain_of(url))
        .bind(timestamp)
        .execute(pool)
        .await
        .context("Failed to insert target")?;

    sqlx::query_as("SELECT * FROM targets WHERE url = ?")
        .bind(url)
        .fetch_one(pool)
        .await
        .context("Failed to fetch target")
}

/// Count all targets.
pub async fn count_targets(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM targets")
        .fetch_one(pool)
        .await
        .context("Failed to count targets")?;
    Ok(row.0)
}

// ========== Results ==========

/// Append one result per extractor in `index` to `target_id`.
///
/// Not idempotent: the same index appended twice yields duplicate rows.
pub async fn append_results(
    pool: &SqlitePool,
    target_id: i64,
    index: &NormalizedIndex,
) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for (extractor, run) in &index.history {
        sqlx::query(
            r"
            INSERT INTO results (target_id, timestamp, start_ts, end_ts, status, output, extractor)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(target_id)
        .bind(index.timestamp)
        .bind(&run.start_ts)
        .bind(&run.end_ts)
        .bind(run.status)
        .bind(&run.output)
        .bind(extractor)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert {extractor} result"))?;
    }

    tx.commit().await.context("Failed to commit results")?;
    Ok(index.history.len())
}

/// Persist a normalized index: get-or-create its target, then append its results.
pub async fn save_index(pool: &SqlitePool, index: &NormalizedIndex) -> Result<Target> {
    let target = get_or_create_target(pool, &index.url, index.timestamp).await?;
    append_results(pool, target.id, index).await?;
    Ok(target)
}

/// Results for a target, successes first, newest first.
///
/// A non-empty `extractors` restricts the rows to those extractor names.
pub async fn get_results_for_target(
    pool: &SqlitePool,
    target_id: i64,
    extractors: &[String],
) -> Result<Vec<ExtractorResult>> {
    let extractor_clause = if extractors.is_empty() {
        String::new()
    } else {
        format!(" AND extractor IN ({})", placeholders(extractors.len()))
    };
    let sql = format!(
        "SELECT id, target_id, timestamp, start_ts, end_ts, status, output, extractor
         FROM results
         WHERE target_id = ?{extractor_clause}
         ORDER BY status DESC, timestamp DESC, id ASC"
    );

    let mut query = sqlx::query_as::<_, ExtractorResult>(&sql).bind(target_id);
    for extractor in extractors {
        query = query.bind(extractor);
    }
    query
        .fetch_all(pool)
        .await
        .context("Failed to fetch results for target")
}

// ========== Tags ==========

/// Get or create a tag by name.
pub async fn get_or_create_tag(pool: &SqlitePool, name: &str) -> Result<Tag> {
    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to insert tag")?;

    sqlx::query_as("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .context("Failed to fetch tag")
}

/// Get or create the association between a tag and a target, returning its ID.
pub async fn get_or_create_tagging(pool: &SqlitePool, tag_id: i64, target_id: i64) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO taggings (tag_id, target_id) VALUES (?, ?)")
        .bind(tag_id)
        .bind(target_id)
        .execute(pool)
        .await
        .context("Failed to insert tagging")?;

    let row: (i64,) = sqlx::query_as("SELECT id FROM taggings WHERE tag_id = ? AND target_id = ?")
        .bind(tag_id)
        .bind(target_id)
        .fetch_one(pool)
        .await
        .context("Failed to fetch tagging")?;
    Ok(row.0)
}

/// Attach each tag name to the target for `url`.
///
/// Fails with [`ArchiveError::TargetNotFound`] if the URL has no target yet.
pub async fn tag_target(pool: &SqlitePool, url: &str, tag_names: &[String]) -> Result<()> {
    let target = get_target_by_url(pool, url)
        .await?
        .ok_or_else(|| ArchiveError::TargetNotFound(url.to_string()))?;

    for name in tag_names {
        let tag = get_or_create_tag(pool, name).await?;
        get_or_create_tagging(pool, tag.id, target.id).await?;
    }

    Ok(())
}

/// Tag names attached to a target, alphabetically.
pub async fn get_tag_names_for_target(pool: &SqlitePool, target_id: i64) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r"
        SELECT g.name
        FROM taggings tg
        JOIN tags g ON g.id = tg.tag_id
        WHERE tg.target_id = ?
        ORDER BY g.name
        ",
    )
    .bind(target_id)
    .fetch_all(pool)
    .await
    .context("Failed to fetch tags for target")?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

// ========== Listing ==========

/// List targets matching every non-empty constraint in `filter`.
///
/// A target matches `tag_names` if it carries at least one of them.
pub async fn filter_targets(pool: &SqlitePool, filter: &TargetFilter) -> Result<Vec<TargetView>> {
    let mut sql = String::from("SELECT DISTINCT t.* FROM targets t");
    let mut clauses = Vec::new();
    let mut values: Vec<&str> = Vec::new();

    if !filter.tag_names.is_empty() {
        sql.push_str(" JOIN taggings tg ON tg.target_id = t.id JOIN tags g ON g.id = tg.tag_id");
        clauses.push(format!("g.name IN ({})", placeholders(filter.tag_names.len())));
        values.extend(filter.tag_names.iter().map(String::as_str));
    }
    if !filter.domains.is_empty() {
        clauses.push(format!("t.domain IN ({})", placeholders(filter.domains.len())));
        values.extend(filter.domains.iter().map(String::as_str));
    }
    if !filter.urls.is_empty() {
        clauses.push(format!("t.url IN ({})", placeholders(filter.urls.len())));
        values.extend(filter.urls.iter().map(String::as_str));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

    let mut query = sqlx::query_as::<_, Target>(&sql);
    for value in values {
        query = query.bind(value);
    }
    let targets = query
        .fetch_all(pool)
        .await
        .context("Failed to filter targets")?;

    let mut views = Vec::with_capacity(targets.len());
    for target in targets {
        let results = get_results_for_target(pool, target.id, &filter.extractors).await?;
        let tags = get_tag_names_for_target(pool, target.id).await?;
        views.push(TargetView {
            target,
            results,
            tags,
        });
    }

    Ok(views)
}

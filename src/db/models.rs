use serde::{Deserialize, Serialize};

/// A uniquely archived URL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Target {
    pub id: i64,
    pub url: String,
    pub domain: String,
    /// Capture epoch of the first snapshot seen for this URL.
    pub timestamp: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// One extractor's outcome for one archive run of a target.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExtractorResult {
    pub id: i64,
    #[serde(skip)]
    pub target_id: i64,
    pub timestamp: f64,
    pub start_ts: Option<String>,
    pub end_ts: Option<String>,
    pub status: bool,
    pub output: Option<String>,
    pub extractor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Constraints for listing targets. Empty lists do not constrain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetFilter {
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    /// Restricts the nested results, not the targets.
    #[serde(default)]
    pub extractors: Vec<String>,
}

/// Target with its results and tag names, for display.
#[derive(Debug, Clone, Serialize)]
pub struct TargetView {
    #[serde(flatten)]
    pub target: Target,
    pub results: Vec<ExtractorResult>,
    pub tags: Vec<String>,
}

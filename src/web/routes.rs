use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::error;
use url::Url;

use super::response::{bad_request, ApiResponse};
use super::AppState;
use crate::archivebox::{AddOptions, Extractor, InputParser};
use crate::db::TargetFilter;

const MAX_TAG_LEN: usize = 100;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/init", get(init))
        .route("/sync", get(sync))
        .route("/add", post(add))
        .route("/list", post(list))
        .route("/healthz", get(health))
}

/// Body of `POST /add`.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub tag: Vec<String>,
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub update_all: bool,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub extractors: Vec<Extractor>,
    #[serde(default)]
    pub parser: Option<InputParser>,
}

impl AddRequest {
    /// Validate the request and turn it into tool options.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn into_options(self) -> Result<AddOptions, String> {
        if self.urls.is_empty() {
            return Err("urls: at least one URL is required".to_string());
        }
        for url in &self.urls {
            let parsed = Url::parse(url).map_err(|e| format!("urls: invalid URL '{url}': {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("urls: '{url}' must use http or https"));
            }
        }
        if let Some(tag) = self
            .tag
            .iter()
            .find(|t| t.is_empty() || t.chars().count() > MAX_TAG_LEN)
        {
            return Err(format!(
                "tag: '{tag}' must be between 1 and {MAX_TAG_LEN} characters"
            ));
        }
        if self.depth > 1 {
            return Err(format!("depth: must be 0 or 1, got {}", self.depth));
        }

        Ok(AddOptions {
            urls: self.urls,
            tags: self.tag,
            depth: self.depth,
            update: self.update,
            update_all: self.update_all,
            overwrite: self.overwrite,
            extractors: self.extractors,
            parser: Some(self.parser.unwrap_or_default()),
        })
    }
}

async fn init(State(state): State<AppState>) -> Response {
    match state.service.initialize().await {
        Ok(message) => ApiResponse::<()>::success(message).into_response(),
        Err(e) => {
            error!("Initialization failed: {e}");
            ApiResponse::<()>::from(&e).into_response()
        }
    }
}

async fn sync(State(state): State<AppState>) -> Response {
    match state.service.synchronize().await {
        Ok(report) => ApiResponse::success("Local data synchronized successfully.")
            .with_data(report)
            .into_response(),
        Err(e) => {
            error!("Synchronization failed: {e}");
            ApiResponse::<()>::from(&e).into_response()
        }
    }
}

async fn add(
    State(state): State<AppState>,
    payload: Result<Json<AddRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let options = match request.into_options() {
        Ok(o) => o,
        Err(message) => return bad_request(message),
    };

    match state.service.add_urls(&options).await {
        Ok(outcome) => ApiResponse::<()>::from(outcome).into_response(),
        Err(e) => {
            error!("Add request failed: {e}");
            ApiResponse::<()>::from(&e).into_response()
        }
    }
}

async fn list(
    State(state): State<AppState>,
    payload: Result<Json<TargetFilter>, JsonRejection>,
) -> Response {
    let Json(filter) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match state.service.list_targets(&filter).await {
        Ok(targets) => ApiResponse::success("Targets retrieved successfully.")
            .with_data(targets)
            .into_response(),
        Err(e) => {
            error!("Failed to list targets: {e:#}");
            ApiResponse::<()>::error("Failed to retrieve targets.")
                .with_error(format!("{e:#}"))
                .into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

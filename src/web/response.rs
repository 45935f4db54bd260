//! JSON envelope shared by every API route.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::archiver::{AddOutcome, ExtractorPaths};
use crate::error::ArchiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    PartialSuccess,
    Error,
}

impl ResponseStatus {
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::PartialSuccess => StatusCode::MULTI_STATUS,
            Self::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T = ()> {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_paths: Option<BTreeMap<String, ExtractorPaths>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn new(status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
            stderr: None,
            archive_paths: None,
            failed_urls: None,
            data: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Error, message)
    }

    #[must_use]
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl<T> From<&ArchiveError> for ApiResponse<T> {
    fn from(err: &ArchiveError) -> Self {
        let message = err.to_string();
        let mut response = Self::error(message.clone());
        if !matches!(err, ArchiveError::AlreadyExists) {
            response.error = Some(message);
        }
        response.stderr = err.stderr().map(str::to_string);
        response
    }
}

impl From<AddOutcome> for ApiResponse {
    fn from(outcome: AddOutcome) -> Self {
        let AddOutcome {
            archive_paths,
            failed_urls,
        } = outcome;

        match (archive_paths.is_empty(), failed_urls.is_empty()) {
            (false, true) => {
                let mut response = Self::success("All URLs processed successfully.");
                response.archive_paths = Some(archive_paths);
                response
            }
            (false, false) => {
                let mut response =
                    Self::new(ResponseStatus::PartialSuccess, "URLs processed with some failures.");
                response.archive_paths = Some(archive_paths);
                response.failed_urls = Some(failed_urls);
                response
            }
            (true, _) => {
                let mut response = Self::error("All URLs failed to process.");
                response.failed_urls = Some(failed_urls);
                response
            }
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status.http_status(), Json(self)).into_response()
    }
}

/// A 400 carrying an error envelope.
pub fn bad_request(message: impl Into<String>) -> Response {
    let message = message.into();
    let body: ApiResponse = ApiResponse::error("Invalid request.").with_error(message);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

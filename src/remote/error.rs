use crate::types::series::DuplicateDateError;
use std::time::Duration;
use thiserror::Error;

/// The request to the observation API did not produce a successful response.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    Request(String, #[source] reqwest::Error),

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout {
        url: String,
        timeout: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },
}

/// The response arrived but does not have the expected shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to parse JSON response")]
    Json(#[from] serde_json::Error),

    #[error("Response is missing the '{0}' key")]
    MissingKey(String),

    #[error("Parameter {parameter} has an unparsable date key '{key}'")]
    InvalidDate { parameter: String, key: String },

    #[error(transparent)]
    DuplicateDate(#[from] DuplicateDateError),
}

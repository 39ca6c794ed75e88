use serde::Serialize;
use thiserror::Error;

/// Why a book search failed. Every kind is worth a user-initiated retry.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchError {
    #[error("invalid search URL: {url}")]
    InvalidUrl { url: String },

    #[error("server error occurred (HTTP {status})")]
    ServerError { status: u16 },

    #[error("failed to decode response: {message}")]
    DecodingError { message: String },

    #[error("network error: {message}")]
    NetworkError { message: String },
}

impl SearchError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidUrl { .. } => "invalid_url",
            SearchError::ServerError { .. } => "server_error",
            SearchError::DecodingError { .. } => "decoding_error",
            SearchError::NetworkError { .. } => "network_error",
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::DecodingError {
                message: err.to_string(),
            }
        } else {
            SearchError::NetworkError {
                message: err.to_string(),
            }
        }
    }
}

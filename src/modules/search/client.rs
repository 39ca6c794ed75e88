//! Remote book metadata search (Google Books volumes API).

use async_trait::async_trait;
use lectern_kernel::settings::SearchSettings;

use super::error::SearchError;
use super::models::{BookCandidate, VolumesResponse};

/// Anything that can turn a free-text query into book candidates.
#[async_trait]
pub trait BookSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<BookCandidate>, SearchError>;
}

/// HTTP client for the Google Books volumes endpoint.
#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    http: reqwest::Client,
    base_url: String,
    max_results: u32,
}

impl GoogleBooksClient {
    pub fn new(settings: &SearchSettings) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            max_results: settings.max_results,
        })
    }

    /// `{base}?q={query}&maxResults={n}&printType=books`
    pub fn request_url(&self, query: &str) -> Result<reqwest::Url, SearchError> {
        let raw = format!(
            "{}?q={}&maxResults={}&printType=books",
            self.base_url,
            urlencoding::encode(query),
            self.max_results
        );
        reqwest::Url::parse(&raw).map_err(|_| SearchError::InvalidUrl { url: raw })
    }
}

#[async_trait]
impl BookSearch for GoogleBooksClient {
    async fn search(&self, query: &str) -> Result<Vec<BookCandidate>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = self.request_url(query)?;
        tracing::debug!(target: "lectern::search", %query, "searching book metadata");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(target: "lectern::search", %query, status = status.as_u16(), "metadata search failed");
            return Err(SearchError::ServerError {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let candidates = parse_volumes(&body)?;
        tracing::debug!(target: "lectern::search", %query, results = candidates.len(), "metadata search done");
        Ok(candidates)
    }
}

/// Decode a volumes response body. A missing `items` array means no results.
pub fn parse_volumes(body: &[u8]) -> Result<Vec<BookCandidate>, SearchError> {
    let response: VolumesResponse =
        serde_json::from_slice(body).map_err(|err| SearchError::DecodingError {
            message: err.to_string(),
        })?;

    Ok(response
        .items
        .unwrap_or_default()
        .into_iter()
        .map(BookCandidate::from)
        .collect())
}

//! HTTP client for murmur
//!
//! Talks to the service's HTTP routes, as an alternative to the tarpc
//! transport. Mirrors [`MurmurClient`](crate::MurmurClient) except that
//! `submit` cannot report the new id, since the route only answers `ok`.
//!
//! # Example
//!
//! ```ignore
//! use murmur_client::MurmurHttpClient;
//!
//! let client = MurmurHttpClient::new("http://localhost:8080")?;
//! client.submit(&NewOpinion::new(10.0, 20.0, "hello").with_ttl(60)).await?;
//! ```

use murmur_types::opinion::{NearQuery, NewOpinion, Opinion};
use murmur_types::stats::ServiceStats;
use reqwest::{Response, StatusCode};

/// Error type for HTTP client operations
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("Invalid base URL: {0}")]
    Url(String),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server rejected the request ({status}): {message}")]
    Server { status: StatusCode, message: String },
}

impl HttpClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpClientError::Server { status, .. } => *status == StatusCode::SERVICE_UNAVAILABLE,
            HttpClientError::Request(e) => e.is_connect() || e.is_timeout(),
            HttpClientError::Url(_) => false,
        }
    }
}

#[derive(Clone)]
pub struct MurmurHttpClient {
    base_url: String,
    http: reqwest::Client,
}

impl MurmurHttpClient {
    pub fn new(base_url: &str) -> Result<Self, HttpClientError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpClientError::Url(base_url.to_string()));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, HttpClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(HttpClientError::Server { status, message })
    }

    pub async fn submit(&self, opinion: &NewOpinion) -> Result<(), HttpClientError> {
        let response = self
            .http
            .post(self.url("/add/opinion"))
            .json(opinion)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn near(&self, query: &NearQuery) -> Result<Vec<Opinion>, HttpClientError> {
        let response = self
            .http
            .post(self.url("/opinions/near"))
            .json(query)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn stats(&self) -> Result<ServiceStats, HttpClientError> {
        let response = self.http.get(self.url("/stats")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

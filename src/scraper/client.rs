//! Blocking HTTP client: one GET per page, body returned as text. No retries.

use crate::scraper::{PageSource, ScraperError};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; farms-epub/0.1)";

/// Blocking HTTP client used for the landing page and every chapter page.
#[derive(Debug)]
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    /// Build a client with the default User-Agent and the transport's default timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Perform a single GET request.
    pub fn get(&self, url: &str) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.inner.get(url).send()
    }
}

impl PageSource for HttpClient {
    fn fetch_text(&mut self, url: &str) -> Result<String, ScraperError> {
        tracing::debug!(url, "GET");
        let response = self.get(url).map_err(|e| ScraperError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().map_err(|e| ScraperError::BodyRead {
            url: url.to_string(),
            source: e,
        })
    }
}

/// Builder for [HttpClient] with optional User-Agent and timeout.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

impl HttpClientBuilder {
    /// Set a custom User-Agent. If not set, a default identifying this tool is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. If not set, reqwest's default applies.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut builder = reqwest::blocking::Client::builder().user_agent(user_agent);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(HttpClient {
            inner: builder.build()?,
        })
    }
}

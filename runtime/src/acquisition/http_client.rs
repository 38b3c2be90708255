//! Async HTTP client wrapping reqwest.
//!
//! Not a browser: plain textual requests for the lightweight search page.
//! Follows redirects and bounds the whole exchange with a timeout. No
//! retries: one call, one request.

use anyhow::Result;
use std::time::Duration;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the discovery stage.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client with the given desktop user-agent.
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Perform a single GET request with the given query parameters.
    ///
    /// Non-2xx statuses are returned as responses, not errors; only
    /// transport failures (connect, timeout, body read) are `Err`.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        let r = self.client.get(url).query(query).send().await?;

        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let body = r.text().await?;

        Ok(HttpResponse {
            final_url,
            status,
            body,
        })
    }
}

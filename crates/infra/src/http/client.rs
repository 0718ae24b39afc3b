//! HTTP client wrapper with retry and backoff
//!
//! Server errors and transient transport failures are retried with
//! exponential backoff. Client errors (4xx) pass through untouched;
//! the caller decides what they mean.

use std::time::Duration;

use costsync_domain::{CostsyncError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_BACKOFF_MS: u64 = 200;

/// HTTP client with retry defaults suited to external API calls.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
    base_backoff_ms: u64,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Start building a request; pass the result to [`send`](Self::send)
    /// to get retry handling.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send with retries. Responses with server-error status and
    /// transport failures that look transient are retried up to the
    /// attempt limit; the final response or error is returned as-is.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let current = match request.try_clone() {
                Some(cloned) => cloned,
                // Streaming bodies cannot be replayed; send once.
                None => {
                    return request
                        .send()
                        .await
                        .map_err(|err| CostsyncError::Network(err.to_string()));
                }
            };
            match current.send().await {
                Ok(response)
                    if response.status().is_server_error() && attempt < self.max_attempts =>
                {
                    let delay = self.backoff_delay(attempt);
                    debug!(
                        attempt,
                        status = response.status().as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "server error, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => return Ok(response),
                Err(err) if should_retry_error(&err) && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    debug!(
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "transport error, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(CostsyncError::Network(err.to_string())),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms << (attempt - 1))
    }
}

/// Timeouts and connection failures are worth another attempt; anything
/// else (TLS, malformed URL, body errors) is not.
fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| CostsyncError::Network(format!("failed to build HTTP client: {err}")))?;
        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            base_backoff_ms: self.base_backoff.as_millis() as u64,
        })
    }
}

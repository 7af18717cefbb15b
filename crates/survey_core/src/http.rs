use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};

/// Deadline applied when a caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to parse the response from {url}")]
    Parse {
        url: String,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to fetch data from {url}")]
    Transport {
        url: String,
        status: Option<reqwest::StatusCode>,
    },
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Timed JSON GET. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.get_with_timeout(url, DEFAULT_TIMEOUT).await
    }

    pub async fn get_with_timeout<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, FetchError> {
        let response = self
            .inner
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    return FetchError::Timeout {
                        url: url.to_string(),
                        timeout,
                    };
                }
                error!(%url, "request failed: {err}");
                FetchError::Transport {
                    url: url.to_string(),
                    status: err.status(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(%url, %status, "server returned a non-success status");
            return Err(FetchError::Transport {
                url: url.to_string(),
                status: Some(status),
            });
        }

        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                return FetchError::Timeout {
                    url: url.to_string(),
                    timeout,
                };
            }
            FetchError::Transport {
                url: url.to_string(),
                status: Some(status),
            }
        })?;

        serde_json::from_str(&body).map_err(|source| {
            debug!(%url, %body, "unparsable response body");
            FetchError::Parse {
                url: url.to_string(),
                body,
                source,
            }
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;

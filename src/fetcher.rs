use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::Config;

/// Why a single feed could not be downloaded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    #[error("Non-200 status code: {0}")]
    HttpStatus(u16),
    #[error("Failed to read response body: {0}")]
    Body(reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Downloads feed documents. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client, e.g. one with a shorter timeout in tests.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// One GET, no retries. Anything but `200 OK` is an error.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e)
            }
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(timeout: Duration) -> Fetcher {
        let client = Client::builder().timeout(timeout).build().unwrap();
        Fetcher::with_client(client)
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rustlang/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = test_fetcher(Duration::from_secs(5));
        let body = fetcher
            .fetch(&format!("{}/rustlang/rss", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, b"<rss/>");
    }

    #[tokio::test]
    async fn test_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = test_fetcher(Duration::from_secs(5));
        let result = fetcher.fetch(&format!("{}/missing/rss", server.uri())).await;

        assert!(matches!(result, Err(FetchError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_other_2xx_is_still_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let fetcher = test_fetcher(Duration::from_secs(5));
        let result = fetcher.fetch(&server.uri()).await;

        assert!(matches!(result, Err(FetchError::HttpStatus(204))));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<rss/>")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = test_fetcher(Duration::from_millis(100));
        let result = fetcher.fetch(&server.uri()).await;

        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Nothing listens on port 1
        let fetcher = test_fetcher(Duration::from_secs(5));
        let result = fetcher.fetch("http://127.0.0.1:1/rss").await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_is_network_error() {
        let fetcher = test_fetcher(Duration::from_secs(5));
        let result = fetcher.fetch("not a url").await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[test]
    fn test_new_uses_config() {
        let config = Config::default();
        assert!(Fetcher::new(&config).is_ok());
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::app::{CancelToken, GatorError, Result};
use crate::fetcher::Fetcher;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// `timeout` bounds the whole round trip, connect through body transfer.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatorError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatorError::Cancelled),
            result = self.get(url) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "<rss><channel><title>t</title></channel></rss>";

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed.xml")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let body = fetcher
            .fetch(&format!("{}/feed.xml", server.url()), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(body, BODY.as_bytes());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.xml")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing.xml", server.url()), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_fetch_other_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/empty.xml")
            .with_status(204)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/empty.xml", server.url()), &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::HttpStatus(204)));
    }

    #[tokio::test]
    async fn test_fetch_connection_failure_is_network_error() {
        let fetcher = HttpFetcher::with_options(Duration::from_secs(2), DEFAULT_USER_AGENT).unwrap();
        // Port 9 (discard) on localhost is not listening in test environments.
        let err = fetcher
            .fetch("http://127.0.0.1:9/feed.xml", &CancelToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/feed.xml", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Cancelled));
    }

    #[tokio::test]
    async fn test_fetch_cancelled_in_flight() {
        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let cancel = CancelToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                cancel.cancel();
            });
        }

        let fetcher = HttpFetcher::new().unwrap();
        let started = std::time::Instant::now();
        let err = fetcher
            .fetch(&format!("http://{}/feed.xml", addr), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}

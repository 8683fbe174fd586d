use crate::config::FetchSettings;
use crate::crawl::PageSource;
use crate::localize::ImageFetcher;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fixed pause after each network operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimit {
    delay: Duration,
}

impl RateLimit {
    /// Pause for `delay` after every request.
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No pause.
    pub const fn none() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    /// Configured delay.
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the configured delay.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// HTTP client for answer pages and their images
pub struct Fetcher {
    client: Client,
    rate_limit: RateLimit,
}

impl Fetcher {
    /// Creates a fetcher from configured settings, including the rate limit
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Self::client(settings.timeout(), &settings.user_agent)?;
        Ok(Self {
            client,
            rate_limit: RateLimit::new(settings.delay()),
        })
    }

    /// Creates a fetcher with a custom request timeout and no delay (primarily for tests)
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Self::client(timeout, &FetchSettings::default().user_agent)?;
        Ok(Self {
            client,
            rate_limit: RateLimit::none(),
        })
    }

    /// Replace the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    fn client(timeout: Duration, user_agent: &str) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)
    }

    /// Fetches a URL and returns the response body.
    ///
    /// 404 maps to [`Error::NotFound`], any other non-success status to
    /// [`Error::Fetch`]. The rate-limit pause runs after every attempt,
    /// successful or not.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let result = self.request(url).await;
        self.rate_limit.pause().await;
        result
    }

    async fn request(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url)?;
        let response = self.client.get(parsed).send().await?;
        let status = response.status();

        if !status.is_success() {
            // Map 404 to a clearer NotFound error
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("Resource not found at '{url}'")));
            }
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.bytes().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_bytes(url).await
    }
}

#[async_trait]
impl ImageFetcher for Fetcher {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_bytes(url).await
    }
}

// Note: Default is not implemented as Fetcher::new() can fail.

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header_exists, method, path},
    };

    #[tokio::test]
    async fn test_fetcher_creation() {
        assert!(Fetcher::new(&FetchSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_bytes_success() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Why/answer/Jane"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<html>ok</html>".to_vec()))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_secs(5))?;
        let body = fetcher
            .fetch_bytes(&format!("{}/Why/answer/Jane", server.uri()))
            .await?;
        assert_eq!(body, b"<html>ok</html>");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_404_is_not_found() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_secs(5))?;
        let err = fetcher
            .fetch_bytes(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_500_is_fetch_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_secs(5))?;
        match fetcher.fetch_bytes(&format!("{}/busy", server.uri())).await {
            Err(Error::Fetch { reason, .. }) => assert!(reason.contains("503")),
            other => panic!("expected fetch error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_timeout() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_millis(200))?;
        let err = fetcher
            .fetch_bytes(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_recoverable(), "timeouts are recoverable: {err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_url() -> anyhow::Result<()> {
        let fetcher = Fetcher::with_timeout(Duration::from_secs(1))?;
        let err = fetcher.fetch_bytes("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_rate_limit_pauses_after_each_request() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = Fetcher::with_timeout(Duration::from_secs(5))?
            .with_rate_limit(RateLimit::new(Duration::from_millis(100)));
        let url = format!("{}/a.png", server.uri());

        let start = Instant::now();
        fetcher.fetch_image(&url).await?;
        fetcher.fetch_page(&url).await?;
        assert!(start.elapsed() >= Duration::from_millis(200));
        Ok(())
    }

    #[test]
    fn test_rate_limit_from_settings() {
        let settings = FetchSettings {
            delay_secs: 0.5,
            ..FetchSettings::default()
        };
        let fetcher = Fetcher::new(&settings).unwrap();
        assert_eq!(fetcher.rate_limit.delay(), Duration::from_millis(500));
    }
}

//! HTTP image byte fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::provider::{ImageFetcher, ProviderError, ProviderResult};

/// Fetches image bytes over plain HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: format!("image fetch from {} failed", url),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_construction() {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(30));
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_errors() {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(1)).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:1/image.png").await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }
}

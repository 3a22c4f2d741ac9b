/// HTTP client for a registry served by another process
use crate::{
    error::{NameError, NameResult},
    registry::{DomainRecord, RecordKey, Registry},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Registry reached over HTTP (`GET {base}/records/{domain}/{key}`)
#[derive(Clone)]
pub struct RemoteRegistry {
    base_url: String,
    http_client: reqwest::Client,
}

impl RemoteRegistry {
    /// Create a client with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> NameResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("namegate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| NameError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_url(&self, domain: &str, key: &RecordKey) -> NameResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| NameError::ResolutionFailed(format!("Invalid registry URL: {}", e)))?;
        let key = key.to_string();
        url.path_segments_mut()
            .map_err(|_| NameError::ResolutionFailed("Registry URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["records", domain, key.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl Registry for RemoteRegistry {
    async fn get_record(&self, domain: &str, key: &RecordKey) -> NameResult<DomainRecord> {
        let url = self.record_url(domain, key)?;
        debug!(%url, "Registry GET");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| NameError::ResolutionFailed(format!("Registry request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<DomainRecord>()
                .await
                .map_err(|e| NameError::ResolutionFailed(format!("Invalid registry response: {}", e))),
            StatusCode::FORBIDDEN => Err(NameError::Unauthorized(domain.to_string())),
            StatusCode::GONE => Err(NameError::DomainExpired(domain.to_string())),
            status => Err(NameError::ResolutionFailed(format!(
                "Registry returned error: {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_url_escapes_domain() {
        let registry =
            RemoteRegistry::new("http://127.0.0.1:8545/", Duration::from_secs(1)).unwrap();
        let key = RecordKey::derive("A");

        let url = registry.record_url("example.eth", &key).unwrap();
        assert_eq!(
            url.as_str(),
            format!("http://127.0.0.1:8545/records/example.eth/{}", key)
        );

        let url = registry.record_url("a/b", &key).unwrap();
        assert!(url.path().starts_with("/records/a%2Fb/"));
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_resolution_failure() {
        // Port 9 (discard) is not served in test environments
        let registry = RemoteRegistry::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = registry.get_record("example.eth", &RecordKey::derive("A")).await;
        assert!(matches!(result, Err(NameError::ResolutionFailed(_))));
    }
}

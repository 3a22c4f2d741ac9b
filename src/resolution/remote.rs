/// HTTP client for a resolver hop served by another process
use crate::{
    error::{ErrorResponse, NameError, NameResult},
    metrics,
    resolution::{Resolve, ResolvedRecord},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveBody<'a> {
    domain: &'a str,
    record_type: &'a str,
}

/// Resolver reached over HTTP (`POST {base}/resolve`)
#[derive(Clone)]
pub struct RemoteResolver {
    resolve_url: String,
    http_client: reqwest::Client,
}

impl RemoteResolver {
    /// Create a client; every request is bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> NameResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("namegate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| NameError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            resolve_url: format!("{}/resolve", base_url.trim_end_matches('/')),
            http_client,
        })
    }

    pub fn resolve_url(&self) -> &str {
        &self.resolve_url
    }

    async fn call(&self, domain: &str, record_type: &str) -> NameResult<ResolvedRecord> {
        debug!(url = %self.resolve_url, domain = %domain, record_type = %record_type, "Resolver POST");

        let response = self
            .http_client
            .post(&self.resolve_url)
            .json(&ResolveBody {
                domain,
                record_type,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NameError::ResolutionFailed("Resolver request timed out".to_string())
                } else {
                    NameError::ResolutionFailed(format!("Resolver request failed: {}", e))
                }
            })?;

        match response.status() {
            status if status.is_success() => response
                .json::<ResolvedRecord>()
                .await
                .map_err(|e| NameError::ResolutionFailed(format!("Invalid resolver response: {}", e))),
            StatusCode::NOT_FOUND => match response.json::<ErrorResponse>().await {
                Ok(body) if is_record_not_found(&body) => Err(NameError::NotFound),
                _ => Err(NameError::ResolutionFailed(format!(
                    "Resolver route not found at {}",
                    self.resolve_url
                ))),
            },
            StatusCode::SERVICE_UNAVAILABLE => Err(NameError::Unconfigured),
            StatusCode::FORBIDDEN => Err(NameError::Unauthorized(domain.to_string())),
            StatusCode::GONE => Err(NameError::DomainExpired(domain.to_string())),
            status => Err(NameError::ResolutionFailed(format!(
                "Resolver returned error: {}",
                status
            ))),
        }
    }
}

/// A 404 only means "no record" when the resolver says so. Anything else is
/// a misrouted request, e.g. a wrong base path.
fn is_record_not_found(body: &ErrorResponse) -> bool {
    body.error == "NotFound" && body.message == NameError::NotFound.to_string()
}

#[async_trait]
impl Resolve for RemoteResolver {
    async fn resolve(&self, domain: &str, record_type: &str) -> NameResult<ResolvedRecord> {
        let started = Instant::now();
        let result = self.call(domain, record_type).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(_) => metrics::record_upstream("resolver", "success", elapsed),
            Err(NameError::ResolutionFailed(cause)) => {
                error!(
                    domain = %domain,
                    record_type = %record_type,
                    error = %cause,
                    "Resolver lookup failed"
                );
                metrics::record_upstream("resolver", "failure", elapsed);
            }
            Err(e) => metrics::record_upstream("resolver", e.kind(), elapsed),
        }

        result
    }
}

/// Resolution Service - stateless translation from (domain, recordType) to a registry lookup
///
/// Derives the registry key, issues exactly one bounded registry query and
/// maps ledger failures onto the shared error taxonomy. It never caches and
/// never clamps TTLs.

pub mod remote;

pub use remote::RemoteResolver;

use crate::{
    error::{NameError, NameResult},
    metrics,
    registry::{RecordKey, Registry},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Successful resolution as returned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecord {
    pub value: String,
    pub ttl: u64,
    pub last_updated: i64,
}

/// Anything that can answer a resolution query: the in-process service or a
/// remote resolver hop.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, domain: &str, record_type: &str) -> NameResult<ResolvedRecord>;
}

/// Translation layer in front of the registry
#[derive(Clone)]
pub struct ResolutionService {
    registry: Option<Arc<dyn Registry>>,
    timeout: Duration,
}

impl ResolutionService {
    /// Create a service. `None` means no registry is configured and every
    /// call fails with [`NameError::Unconfigured`].
    pub fn new(registry: Option<Arc<dyn Registry>>, timeout: Duration) -> Self {
        if registry.is_none() {
            warn!("Registry not configured. Resolution requests will be rejected.");
        }
        Self { registry, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.registry.is_some()
    }

    async fn query(
        &self,
        registry: &dyn Registry,
        domain: &str,
        record_type: &str,
    ) -> NameResult<ResolvedRecord> {
        let key = RecordKey::derive(record_type);
        debug!(domain = %domain, record_type = %record_type, record_key = %key, "Querying registry");

        let record = match tokio::time::timeout(self.timeout, registry.get_record(domain, &key)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(NameError::ResolutionFailed(format!(
                    "Registry query timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        };

        if record.is_empty() {
            return Err(NameError::NotFound);
        }

        Ok(ResolvedRecord {
            value: record.value,
            ttl: record.ttl,
            last_updated: record.last_updated,
        })
    }
}

#[async_trait]
impl Resolve for ResolutionService {
    async fn resolve(&self, domain: &str, record_type: &str) -> NameResult<ResolvedRecord> {
        let registry = self.registry.as_deref().ok_or(NameError::Unconfigured)?;

        let started = Instant::now();
        let result = self.query(registry, domain, record_type).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(_) => metrics::record_upstream("registry", "success", elapsed),
            Err(NameError::ResolutionFailed(cause)) => {
                error!(
                    domain = %domain,
                    record_type = %record_type,
                    error = %cause,
                    "Failed to resolve domain"
                );
                metrics::record_upstream("registry", "failure", elapsed);
            }
            Err(e) => metrics::record_upstream("registry", e.kind(), elapsed),
        }

        result
    }
}

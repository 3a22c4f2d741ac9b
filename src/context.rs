/// Application context and dependency injection
use crate::{
    config::{Role, ServerConfig},
    edge::{EdgeCacheService, EdgeSettings},
    error::{NameError, NameResult},
    rate_limit::RateLimiter,
    registry::{seed, LedgerRegistry, LedgerSettings, Registry, RemoteRegistry},
    resolution::{RemoteResolver, ResolutionService},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Application context holding the services wired for this process's role
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
    /// Edge cache (gateway and standalone roles)
    pub edge: Option<Arc<EdgeCacheService>>,
    /// Resolution service served directly (resolver role)
    pub resolution: Option<Arc<ResolutionService>>,
    /// Authoritative ledger (registry and standalone roles)
    pub ledger: Option<Arc<LedgerRegistry>>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> NameResult<Self> {
        config.validate()?;

        let registry_timeout = Duration::from_millis(config.resolver.registry_timeout_ms);
        let mut edge = None;
        let mut resolution = None;
        let mut ledger = None;

        match config.role {
            Role::Gateway => {
                let upstream = RemoteResolver::new(
                    &config.gateway.resolver_url,
                    Duration::from_millis(config.gateway.resolver_timeout_ms),
                )?;
                info!(url = %upstream.resolve_url(), "Edge cache forwarding to remote resolver");
                edge = Some(Arc::new(EdgeCacheService::new(
                    Arc::new(upstream),
                    EdgeSettings::from(&config.gateway),
                )));
            }
            Role::Resolver => {
                let registry = match &config.resolver.registry_url {
                    Some(url) => {
                        let remote = RemoteRegistry::new(url, registry_timeout)?;
                        info!(url = %remote.base_url(), "Resolver backed by remote registry");
                        Some(Arc::new(remote) as Arc<dyn Registry>)
                    }
                    None => None,
                };
                resolution = Some(Arc::new(ResolutionService::new(registry, registry_timeout)));
            }
            Role::Registry => {
                ledger = Some(Self::init_ledger(&config).await?);
            }
            Role::Standalone => {
                let local = Self::init_ledger(&config).await?;
                let service = ResolutionService::new(
                    Some(Arc::clone(&local) as Arc<dyn Registry>),
                    registry_timeout,
                );
                edge = Some(Arc::new(EdgeCacheService::new(
                    Arc::new(service),
                    EdgeSettings::from(&config.gateway),
                )));
                ledger = Some(local);
            }
        }

        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            config: Arc::new(config),
            started_at: Instant::now(),
            edge,
            resolution,
            ledger,
            rate_limiter,
        })
    }

    /// Build the ledger and apply the seed file, if any
    async fn init_ledger(config: &ServerConfig) -> NameResult<Arc<LedgerRegistry>> {
        let ledger = Arc::new(LedgerRegistry::new(LedgerSettings::from(&config.registry)));

        if let Some(path) = &config.registry.seed_path {
            let written = seed::apply_seed_file(&ledger, path)
                .await
                .map_err(|e| NameError::Internal(format!("{:#}", e)))?;
            info!(path = %path.display(), records = written, "Ledger seeded");
        }

        Ok(ledger)
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    /// Seconds since the context was created
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

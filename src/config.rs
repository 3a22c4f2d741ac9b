/// Configuration management for namegate
use crate::error::{NameError, NameResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which hop of the resolution chain this process serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Edge cache in front of a remote resolver
    Gateway,
    /// Stateless translation layer in front of a remote registry
    Resolver,
    /// Authoritative in-memory ledger
    Registry,
    /// Gateway endpoints over an in-process resolver and ledger
    Standalone,
}

impl Role {
    /// Port used when `NAMEGATE_PORT` is unset
    pub fn default_port(self) -> u16 {
        match self {
            Role::Gateway | Role::Standalone => 5354,
            Role::Resolver => 8787,
            Role::Registry => 8545,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Gateway => "gateway",
            Role::Resolver => "resolver",
            Role::Registry => "registry",
            Role::Standalone => "standalone",
        }
    }

    /// Whether this role owns an edge cache
    pub fn has_edge_cache(self) -> bool {
        matches!(self, Role::Gateway | Role::Standalone)
    }
}

impl FromStr for Role {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(Role::Gateway),
            "resolver" => Ok(Role::Resolver),
            "registry" => Ok(Role::Registry),
            "standalone" => Ok(Role::Standalone),
            other => Err(NameError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub role: Role,
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    pub resolver: ResolverConfig,
    pub registry: RegistryConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Edge cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the resolver hop
    pub resolver_url: String,
    /// Per-request timeout for the resolver hop
    pub resolver_timeout_ms: u64,
    /// TTL ceiling applied to every cached record
    pub cache_ttl_ceiling: u64,
    pub cache_max_entries: usize,
    pub cache_sweep_interval_secs: u64,
}

/// Resolution service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Registry base URL. `None` leaves the resolver unconfigured.
    pub registry_url: Option<String>,
    pub registry_timeout_ms: u64,
}

/// Ledger configuration for the registry and standalone roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Identity allowed to register domains
    pub admin: String,
    /// TTL applied when a record is written with ttl = 0
    pub default_ttl: u64,
    /// Registration period in seconds
    pub registration_period: u64,
    pub seed_path: Option<PathBuf>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let role = Role::Standalone;
        Self {
            role,
            service: ServiceConfig {
                hostname: "0.0.0.0".to_string(),
                port: role.default_port(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            gateway: GatewayConfig {
                resolver_url: "http://127.0.0.1:8787".to_string(),
                resolver_timeout_ms: 2000,
                cache_ttl_ceiling: 60,
                cache_max_entries: 10_000,
                cache_sweep_interval_secs: 30,
            },
            resolver: ResolverConfig {
                registry_url: None,
                registry_timeout_ms: 2000,
            },
            registry: RegistryConfig {
                admin: "registry-admin".to_string(),
                default_ttl: 300,
                registration_period: 60 * 60 * 24 * 30,
                seed_path: None,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: 500,
                burst_size: 100,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> NameResult<Self> {
        dotenv::dotenv().ok();

        let defaults = ServerConfig::default();

        let role: Role = env::var("NAMEGATE_ROLE")
            .unwrap_or_else(|_| "standalone".to_string())
            .parse()?;

        let hostname = env::var("NAMEGATE_HOSTNAME").unwrap_or(defaults.service.hostname);
        let port = match env::var("NAMEGATE_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| NameError::InvalidInput("Invalid port number".to_string()))?,
            Err(_) => role.default_port(),
        };

        let resolver_url = env::var("NAMEGATE_RESOLVER_URL")
            .unwrap_or(defaults.gateway.resolver_url);
        let resolver_timeout_ms = parse_or("NAMEGATE_RESOLVER_TIMEOUT_MS", 2000);
        let cache_ttl_ceiling = parse_or("NAMEGATE_CACHE_TTL_SECONDS", 60);
        let cache_max_entries = parse_or("NAMEGATE_CACHE_MAX_ENTRIES", 10_000);
        let cache_sweep_interval_secs = parse_or("NAMEGATE_CACHE_SWEEP_INTERVAL_SECS", 30);

        let registry_url = env::var("NAMEGATE_REGISTRY_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let registry_timeout_ms = parse_or("NAMEGATE_REGISTRY_TIMEOUT_MS", 2000);

        let admin = env::var("NAMEGATE_REGISTRY_ADMIN").unwrap_or(defaults.registry.admin);
        let default_ttl = parse_or("NAMEGATE_REGISTRY_DEFAULT_TTL", 300);
        let registration_period =
            parse_or("NAMEGATE_REGISTRY_REGISTRATION_PERIOD", 60 * 60 * 24 * 30);
        let seed_path = env::var("NAMEGATE_REGISTRY_SEED_PATH").ok().map(PathBuf::from);

        let rate_limit_enabled = parse_or("NAMEGATE_RATE_LIMIT_ENABLED", true);
        let requests_per_second = parse_or("NAMEGATE_RATE_LIMIT_RPS", 500);
        let burst_size = parse_or("NAMEGATE_RATE_LIMIT_BURST", 100);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let json = env::var("NAMEGATE_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            role,
            service: ServiceConfig {
                hostname,
                port,
                version: defaults.service.version,
            },
            gateway: GatewayConfig {
                resolver_url,
                resolver_timeout_ms,
                cache_ttl_ceiling,
                cache_max_entries,
                cache_sweep_interval_secs,
            },
            resolver: ResolverConfig {
                registry_url,
                registry_timeout_ms,
            },
            registry: RegistryConfig {
                admin,
                default_ttl,
                registration_period,
                seed_path,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                requests_per_second,
                burst_size,
            },
            logging: LoggingConfig {
                level: log_level,
                json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> NameResult<()> {
        if self.service.hostname.is_empty() {
            return Err(NameError::InvalidInput("Hostname cannot be empty".to_string()));
        }

        if self.role == Role::Gateway && self.gateway.resolver_url.trim().is_empty() {
            return Err(NameError::InvalidInput(
                "Gateway role requires NAMEGATE_RESOLVER_URL".to_string(),
            ));
        }

        if self.gateway.resolver_timeout_ms == 0 || self.resolver.registry_timeout_ms == 0 {
            return Err(NameError::InvalidInput(
                "Upstream timeouts must be greater than zero".to_string(),
            ));
        }

        if self.role.has_edge_cache() && self.gateway.cache_max_entries == 0 {
            return Err(NameError::InvalidInput(
                "Cache capacity must be greater than zero".to_string(),
            ));
        }

        if self.registry.registration_period == 0 {
            return Err(NameError::InvalidInput(
                "Registration period must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read and parse an environment variable, falling back on absence or garbage
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

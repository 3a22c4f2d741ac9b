/// In-memory ledger implementing registry ownership and expiry rules
use crate::{
    clock::{Clock, SystemClock},
    config::RegistryConfig,
    error::{NameError, NameResult},
    registry::{DomainInfo, DomainRecord, RecordKey, Registry},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Ledger-wide parameters fixed at start-up
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Identity allowed to register domains
    pub admin: String,
    /// TTL used when a record is written with ttl = 0
    pub default_ttl: u64,
    /// Registration period in seconds
    pub registration_period: u64,
}

impl From<&RegistryConfig> for LedgerSettings {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            admin: config.admin.clone(),
            default_ttl: config.default_ttl,
            registration_period: config.registration_period,
        }
    }
}

#[derive(Debug, Clone)]
struct DomainEntry {
    owner: String,
    registered_at: i64,
    expires_at: i64,
    records: HashMap<RecordKey, DomainRecord>,
}

impl DomainEntry {
    fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    fn info(&self, domain: &str) -> DomainInfo {
        DomainInfo {
            domain: domain.to_string(),
            owner: self.owner.clone(),
            registered_at: self.registered_at,
            expires_at: self.expires_at,
        }
    }
}

/// Authoritative registry held in process memory.
///
/// Domain names are matched exactly (case-sensitive).
pub struct LedgerRegistry {
    settings: LedgerSettings,
    clock: Arc<dyn Clock>,
    domains: RwLock<HashMap<String, DomainEntry>>,
}

impl LedgerRegistry {
    /// Create a ledger on the system clock
    pub fn new(settings: LedgerSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: LedgerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            domains: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Register a domain. Only the ledger admin may register.
    ///
    /// An expired domain can be registered again; it starts with no records.
    pub async fn register(&self, caller: &str, domain: &str, owner: &str) -> NameResult<DomainInfo> {
        if domain.is_empty() || owner.is_empty() {
            return Err(NameError::InvalidInput(
                "Domain and owner cannot be empty".to_string(),
            ));
        }
        if caller != self.settings.admin {
            return Err(NameError::Unauthorized(format!(
                "{} may not register domains",
                caller
            )));
        }

        let now = self.clock.unix_now();
        let mut domains = self.domains.write().await;

        if let Some(existing) = domains.get(domain) {
            if !existing.is_expired(now) {
                return Err(NameError::DomainTaken(domain.to_string()));
            }
        }

        let entry = DomainEntry {
            owner: owner.to_string(),
            registered_at: now,
            expires_at: now.saturating_add(self.period()),
            records: HashMap::new(),
        };
        let info = entry.info(domain);
        domains.insert(domain.to_string(), entry);

        info!(domain = %domain, owner = %owner, expires_at = info.expires_at, "DomainRegistered");
        Ok(info)
    }

    /// Write a record. Caller must own the non-expired domain.
    pub async fn set_record(
        &self,
        caller: &str,
        domain: &str,
        key: RecordKey,
        value: &str,
        ttl: u64,
    ) -> NameResult<DomainRecord> {
        let now = self.clock.unix_now();
        let mut domains = self.domains.write().await;

        let entry = domains
            .get_mut(domain)
            .ok_or_else(|| NameError::DomainNotRegistered(domain.to_string()))?;
        if entry.is_expired(now) {
            return Err(NameError::DomainExpired(domain.to_string()));
        }
        if entry.owner != caller {
            return Err(NameError::Unauthorized(format!(
                "{} does not own {}",
                caller, domain
            )));
        }

        let ttl = if ttl == 0 { self.settings.default_ttl } else { ttl };
        let record = DomainRecord {
            value: value.to_string(),
            ttl,
            last_updated: now,
        };
        entry.records.insert(key, record.clone());

        info!(domain = %domain, record_key = %key, ttl, "RecordUpdated");
        Ok(record)
    }

    /// Current ownership of a domain
    pub async fn get_domain_owner(&self, domain: &str) -> NameResult<DomainInfo> {
        let now = self.clock.unix_now();
        let domains = self.domains.read().await;

        let entry = domains
            .get(domain)
            .ok_or_else(|| NameError::DomainNotRegistered(domain.to_string()))?;
        if entry.is_expired(now) {
            return Err(NameError::DomainExpired(domain.to_string()));
        }

        Ok(entry.info(domain))
    }

    /// Hand a domain to a new owner. Records are kept.
    pub async fn transfer(&self, caller: &str, domain: &str, new_owner: &str) -> NameResult<DomainInfo> {
        if new_owner.is_empty() {
            return Err(NameError::InvalidInput("New owner cannot be empty".to_string()));
        }

        let now = self.clock.unix_now();
        let mut domains = self.domains.write().await;

        let entry = domains
            .get_mut(domain)
            .ok_or_else(|| NameError::DomainNotRegistered(domain.to_string()))?;
        if entry.is_expired(now) {
            return Err(NameError::DomainExpired(domain.to_string()));
        }
        if entry.owner != caller {
            return Err(NameError::Unauthorized(format!(
                "{} does not own {}",
                caller, domain
            )));
        }

        let previous = std::mem::replace(&mut entry.owner, new_owner.to_string());
        info!(domain = %domain, from = %previous, to = %new_owner, "DomainTransferred");
        Ok(entry.info(domain))
    }

    /// Extend a registration by one period. Owner or admin only.
    ///
    /// An expired domain cannot be renewed; it has to be registered again.
    pub async fn renew(&self, caller: &str, domain: &str) -> NameResult<DomainInfo> {
        let now = self.clock.unix_now();
        let period = self.period();
        let mut domains = self.domains.write().await;

        let entry = domains
            .get_mut(domain)
            .ok_or_else(|| NameError::DomainNotRegistered(domain.to_string()))?;
        if entry.is_expired(now) {
            return Err(NameError::DomainExpired(domain.to_string()));
        }
        if entry.owner != caller && caller != self.settings.admin {
            return Err(NameError::Unauthorized(format!(
                "{} may not renew {}",
                caller, domain
            )));
        }

        entry.expires_at = entry.expires_at.max(now).saturating_add(period);
        info!(domain = %domain, expires_at = entry.expires_at, "DomainRenewed");
        Ok(entry.info(domain))
    }

    fn period(&self) -> i64 {
        i64::try_from(self.settings.registration_period).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl Registry for LedgerRegistry {
    async fn get_record(&self, domain: &str, key: &RecordKey) -> NameResult<DomainRecord> {
        let now = self.clock.unix_now();
        let domains = self.domains.read().await;

        match domains.get(domain) {
            None => Ok(DomainRecord::empty()),
            Some(entry) if entry.is_expired(now) => {
                Err(NameError::DomainExpired(domain.to_string()))
            }
            Some(entry) => Ok(entry
                .records
                .get(key)
                .cloned()
                .unwrap_or_else(DomainRecord::empty)),
        }
    }
}

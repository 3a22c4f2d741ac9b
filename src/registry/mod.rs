/// Registry - authoritative ledger of domain ownership and records
///
/// The resolution service only ever reads through the [`Registry`] trait.
/// Two implementations exist:
/// - [`LedgerRegistry`]: in-memory ledger with ownership and expiry rules
/// - [`RemoteRegistry`]: HTTP client for a ledger served by another process

pub mod ledger;
pub mod remote;
pub mod seed;

pub use ledger::{LedgerRegistry, LedgerSettings};
pub use remote::RemoteRegistry;

use crate::error::{NameError, NameResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Fixed-width lookup key derived from a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey([u8; 32]);

impl RecordKey {
    /// Derive the registry key for a record type (SHA-256 of its UTF-8 bytes)
    pub fn derive(record_type: &str) -> Self {
        let digest = Sha256::digest(record_type.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for RecordKey {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| NameError::InvalidInput(format!("Invalid record key: {}", e)))?;
        Ok(Self(bytes))
    }
}

/// Record as stored by the registry. An empty `value` means "not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub value: String,
    pub ttl: u64,
    pub last_updated: i64,
}

impl DomainRecord {
    /// Sentinel returned for unset records
    pub fn empty() -> Self {
        Self {
            value: String::new(),
            ttl: 0,
            last_updated: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Ownership state of a registered domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    pub domain: String,
    pub owner: String,
    pub registered_at: i64,
    pub expires_at: i64,
}

/// Read surface of the registry consumed by the resolution service
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch a record. Unset records come back as [`DomainRecord::empty`];
    /// an expired domain fails with [`NameError::DomainExpired`].
    async fn get_record(&self, domain: &str, key: &RecordKey) -> NameResult<DomainRecord>;
}

/// Start-up seeding of the in-memory ledger from a JSON file
use crate::registry::{LedgerRegistry, RecordKey};
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Seed file layout
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub domains: Vec<SeedDomain>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDomain {
    pub domain: String,
    pub owner: String,
    #[serde(default)]
    pub records: Vec<SeedRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    pub record_type: String,
    pub value: String,
    #[serde(default)]
    pub ttl: u64,
}

/// Apply a seed file through the regular ledger operations.
///
/// Returns the number of records written.
pub async fn apply_seed_file(ledger: &LedgerRegistry, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid seed file {}", path.display()))?;

    apply_seed(ledger, seed).await
}

pub async fn apply_seed(ledger: &LedgerRegistry, seed: SeedFile) -> anyhow::Result<usize> {
    let admin = ledger.settings().admin.clone();
    let mut written = 0;

    for entry in seed.domains {
        ledger
            .register(&admin, &entry.domain, &entry.owner)
            .await
            .with_context(|| format!("Failed to register {}", entry.domain))?;

        for record in entry.records {
            ledger
                .set_record(
                    &entry.owner,
                    &entry.domain,
                    RecordKey::derive(&record.record_type),
                    &record.value,
                    record.ttl,
                )
                .await
                .with_context(|| {
                    format!("Failed to set {} record on {}", record.record_type, entry.domain)
                })?;
            written += 1;
        }
    }

    Ok(written)
}

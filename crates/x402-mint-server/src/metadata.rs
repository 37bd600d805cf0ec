//! Display metadata for minting contracts.
//!
//! Only used to personalize the paywall. A lookup never fails the request:
//! errors are logged and treated as "no metadata".

use std::time::{Duration, Instant};

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::config::SupabaseConfig;

/// Entries (hits and misses) live this long.
pub const METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractMetadata {
    pub display_name: String,
    pub logo_uri: Option<String>,
}

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn get(&self, chain_id: u64, contract: Address) -> Option<ContractMetadata>;
}

/// Used when no metadata source is configured.
pub struct NoMetadata;

#[async_trait]
impl MetadataLookup for NoMetadata {
    async fn get(&self, _chain_id: u64, _contract: Address) -> Option<ContractMetadata> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct MintingPageRow {
    name: Option<String>,
    ipfs_logo: Option<String>,
}

/// `MintingPages` table behind Supabase's PostgREST API.
pub struct SupabaseMetadata {
    client: reqwest::Client,
    config: SupabaseConfig,
    cache: DashMap<(u64, Address), (Instant, Option<ContractMetadata>)>,
}

impl SupabaseMetadata {
    pub fn new(client: reqwest::Client, config: SupabaseConfig) -> Self {
        Self {
            client,
            config,
            cache: DashMap::new(),
        }
    }

    fn cached(&self, key: &(u64, Address)) -> Option<Option<ContractMetadata>> {
        let entry = self.cache.get(key)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < METADATA_TTL {
            Some(value.clone())
        } else {
            None
        }
    }

    async fn fetch(&self, chain_id: u64, contract: Address) -> Result<Option<ContractMetadata>, String> {
        let url = format!(
            "{}/rest/v1/MintingPages",
            self.config.url.trim_end_matches('/')
        );
        // Stored addresses are checksummed.
        let contract = contract.to_checksum(None);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("select", "ipfs_logo,name".to_string()),
                ("deployAddress", format!("eq.{contract}")),
                ("network", format!("eq.{chain_id}")),
                ("limit", "1".to_string()),
            ])
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("supabase returned {}", resp.status()));
        }

        let rows: Vec<MintingPageRow> = resp
            .json()
            .await
            .map_err(|e| format!("response parse failed: {e}"))?;

        Ok(rows.into_iter().next().and_then(|row| {
            row.name
                .filter(|n| !n.trim().is_empty())
                .map(|display_name| ContractMetadata {
                    display_name,
                    logo_uri: row.ipfs_logo.filter(|l| !l.trim().is_empty()),
                })
        }))
    }
}

#[async_trait]
impl MetadataLookup for SupabaseMetadata {
    async fn get(&self, chain_id: u64, contract: Address) -> Option<ContractMetadata> {
        let key = (chain_id, contract);
        if let Some(hit) = self.cached(&key) {
            return hit;
        }

        match self.fetch(chain_id, contract).await {
            Ok(value) => {
                self.cache.insert(key, (Instant::now(), value.clone()));
                value
            }
            Err(e) => {
                // Transient failures are not cached.
                tracing::warn!(chain_id, %contract, error = %e, "metadata lookup failed");
                None
            }
        }
    }
}

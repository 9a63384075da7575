//! # Asset Registry
//!
//! Tracks which external assets the bank accepts and what native precision
//! each carries. Precision is fetched once from the asset's own metadata
//! source and cached forever -- a token does not get to change its decimals
//! halfway through the accounting period.
//!
//! ## Removal Semantics
//!
//! Unregistering an asset only clears its `supported` flag. The precision
//! record, the registration-order slot, and any balances all persist, so an
//! asset can be re-added later without losing historical accounting. The
//! native currency is pre-registered at construction and can never be
//! unregistered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::id::AssetId;
use crate::config::NATIVE_DECIMALS;

// ---------------------------------------------------------------------------
// Metadata Collaborator
// ---------------------------------------------------------------------------

/// Errors a metadata source can report.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The call to the asset's metadata surface failed outright.
    #[error("metadata call failed: {0}")]
    CallFailed(String),

    /// The call succeeded but returned nothing usable.
    #[error("metadata source returned no usable value")]
    Unusable,
}

/// Read-only access to an asset's self-reported metadata.
///
/// In production this is a call into the token's own `decimals()` surface.
/// The registry treats "the call failed" and "the call returned garbage"
/// identically: both reject the asset.
#[async_trait]
pub trait AssetMetadata: Send + Sync {
    /// Returns the asset's native fractional-digit count.
    async fn decimals(&self, asset: AssetId) -> Result<u8, MetadataError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The asset is already registered and supported.
    #[error("asset {0} is already registered")]
    AlreadyRegistered(AssetId),

    /// The asset is not currently registered (or already unsupported).
    #[error("asset {0} is not registered")]
    NotRegistered(AssetId),

    /// The asset's metadata source failed or returned an unusable value.
    /// A token that cannot report its own precision does not get an
    /// account here.
    #[error("asset {asset} rejected: {reason}")]
    InvalidAsset {
        /// The asset that was being probed.
        asset: AssetId,
        /// What the metadata source did wrong.
        reason: String,
    },

    /// The native currency cannot be unregistered.
    #[error("the native currency cannot be unregistered")]
    CannotUnregisterNative,
}

// ---------------------------------------------------------------------------
// AssetRecord
// ---------------------------------------------------------------------------

/// The registry's canonical record for one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// The asset this record describes.
    pub id: AssetId,
    /// Native fractional-digit count, fetched once and cached.
    pub decimals: u8,
    /// Whether deposits of this asset are currently accepted.
    pub supported: bool,
    /// When the asset was first registered (UTC).
    pub registered_at: DateTime<Utc>,
}

/// Interior registry state behind one lock: the records plus the
/// registration order (the order is part of the persisted state layout).
#[derive(Default)]
struct RegistryState {
    records: HashMap<AssetId, AssetRecord>,
    order: Vec<AssetId>,
}

// ---------------------------------------------------------------------------
// AssetRegistry
// ---------------------------------------------------------------------------

/// Registry of accepted assets and their precisions.
///
/// The decimals cache is separate from the records map because the
/// privileged credit path can put balances into assets that were never
/// explicitly registered -- [`decimals_of`](Self::decimals_of) lazily
/// fetches and caches for those.
pub struct AssetRegistry {
    metadata: Arc<dyn AssetMetadata>,
    state: RwLock<RegistryState>,
    decimals_cache: DashMap<AssetId, u8>,
}

impl AssetRegistry {
    /// Creates a registry with the native currency pre-registered.
    pub fn new(metadata: Arc<dyn AssetMetadata>) -> Self {
        let registry = Self {
            metadata,
            state: RwLock::new(RegistryState::default()),
            decimals_cache: DashMap::new(),
        };
        {
            let mut state = registry.state.write();
            state.records.insert(
                AssetId::Native,
                AssetRecord {
                    id: AssetId::Native,
                    decimals: NATIVE_DECIMALS,
                    supported: true,
                    registered_at: Utc::now(),
                },
            );
            state.order.push(AssetId::Native);
        }
        registry.decimals_cache.insert(AssetId::Native, NATIVE_DECIMALS);
        registry
    }

    /// Registers an asset, fetching its precision from the metadata source.
    ///
    /// Re-registering a previously removed asset flips its `supported` flag
    /// back on without refetching -- the original precision record is the
    /// one the balances were booked under.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyRegistered`] when the asset is present and
    /// supported; [`RegistryError::InvalidAsset`] when the metadata source
    /// fails or returns nothing usable.
    pub async fn register(&self, asset: AssetId) -> Result<u8, RegistryError> {
        let existing = {
            let state = self.state.read();
            state
                .records
                .get(&asset)
                .map(|record| (record.supported, record.decimals))
        };
        match existing {
            Some((true, _)) => return Err(RegistryError::AlreadyRegistered(asset)),
            Some((false, decimals)) => {
                let mut state = self.state.write();
                if let Some(record) = state.records.get_mut(&asset) {
                    record.supported = true;
                }
                tracing::info!(%asset, decimals, "asset re-registered");
                return Ok(decimals);
            }
            None => {}
        }

        // Lock released across the metadata call -- collaborators get no
        // say over our lock hold times.
        let decimals = self.fetch_decimals(asset).await?;

        let mut state = self.state.write();
        // A concurrent register may have won the race while we were away.
        if let Some(record) = state.records.get(&asset) {
            if record.supported {
                return Err(RegistryError::AlreadyRegistered(asset));
            }
        }
        state.records.insert(
            asset,
            AssetRecord {
                id: asset,
                decimals,
                supported: true,
                registered_at: Utc::now(),
            },
        );
        if !state.order.contains(&asset) {
            state.order.push(asset);
        }
        drop(state);

        self.decimals_cache.insert(asset, decimals);
        tracing::info!(%asset, decimals, "asset registered");
        Ok(decimals)
    }

    /// Clears an asset's supported flag. Precision and balances persist.
    ///
    /// # Errors
    ///
    /// [`RegistryError::CannotUnregisterNative`] for the native currency,
    /// [`RegistryError::NotRegistered`] when the asset is absent or
    /// already unsupported.
    pub fn unregister(&self, asset: AssetId) -> Result<(), RegistryError> {
        if asset.is_native() {
            return Err(RegistryError::CannotUnregisterNative);
        }
        let mut state = self.state.write();
        match state.records.get_mut(&asset) {
            Some(record) if record.supported => {
                record.supported = false;
                tracing::info!(%asset, "asset unregistered");
                Ok(())
            }
            _ => Err(RegistryError::NotRegistered(asset)),
        }
    }

    /// Returns `true` when deposits of this asset are currently accepted.
    pub fn is_supported(&self, asset: AssetId) -> bool {
        self.state
            .read()
            .records
            .get(&asset)
            .map(|r| r.supported)
            .unwrap_or(false)
    }

    /// Returns the asset's native precision, lazily fetching and caching
    /// on first use. Tolerates assets credited via privileged internal
    /// paths that bypassed explicit registration.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidAsset`] when the asset has no cached
    /// precision and its metadata source cannot supply one.
    pub async fn decimals_of(&self, asset: AssetId) -> Result<u8, RegistryError> {
        if let Some(cached) = self.decimals_cache.get(&asset) {
            return Ok(*cached);
        }
        let decimals = self.fetch_decimals(asset).await?;
        self.decimals_cache.insert(asset, decimals);
        tracing::debug!(%asset, decimals, "decimals fetched and cached");
        Ok(decimals)
    }

    /// Returns every ever-registered asset record in registration order,
    /// including currently unsupported ones.
    pub fn list(&self) -> Vec<AssetRecord> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect()
    }

    /// Seeds records from a snapshot. Existing entries (the pre-registered
    /// native record in particular) are replaced; registration order
    /// follows the snapshot order for assets not already listed.
    pub fn load_records(&self, records: Vec<AssetRecord>) {
        let mut state = self.state.write();
        for record in records {
            self.decimals_cache.insert(record.id, record.decimals);
            if !state.order.contains(&record.id) {
                state.order.push(record.id);
            }
            state.records.insert(record.id, record);
        }
    }

    async fn fetch_decimals(&self, asset: AssetId) -> Result<u8, RegistryError> {
        match self.metadata.decimals(asset).await {
            Ok(decimals) => Ok(decimals),
            Err(e) => Err(RegistryError::InvalidAsset {
                asset,
                reason: e.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Metadata source backed by a fixed map; anything absent errors.
    struct FixedMetadata {
        decimals: HashMap<AssetId, u8>,
    }

    #[async_trait]
    impl AssetMetadata for FixedMetadata {
        async fn decimals(&self, asset: AssetId) -> Result<u8, MetadataError> {
            self.decimals
                .get(&asset)
                .copied()
                .ok_or(MetadataError::Unusable)
        }
    }

    fn token(byte: u8) -> AssetId {
        AssetId::token([byte; 20])
    }

    fn registry_with(pairs: &[(AssetId, u8)]) -> AssetRegistry {
        let decimals = pairs.iter().copied().collect();
        AssetRegistry::new(Arc::new(FixedMetadata { decimals }))
    }

    #[tokio::test]
    async fn native_is_preregistered() {
        let registry = registry_with(&[]);
        assert!(registry.is_supported(AssetId::Native));
        assert_eq!(
            registry.decimals_of(AssetId::Native).await.unwrap(),
            NATIVE_DECIMALS
        );
    }

    #[tokio::test]
    async fn register_fetches_and_caches_decimals() {
        let usdc = token(0x01);
        let registry = registry_with(&[(usdc, 6)]);

        let decimals = registry.register(usdc).await.unwrap();
        assert_eq!(decimals, 6);
        assert!(registry.is_supported(usdc));
        assert_eq!(registry.decimals_of(usdc).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn double_register_rejected() {
        let usdc = token(0x01);
        let registry = registry_with(&[(usdc, 6)]);

        registry.register(usdc).await.unwrap();
        let result = registry.register(usdc).await;
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn register_unknown_asset_rejected() {
        let mystery = token(0x7F);
        let registry = registry_with(&[]);

        let result = registry.register(mystery).await;
        assert!(matches!(result, Err(RegistryError::InvalidAsset { .. })));
        assert!(!registry.is_supported(mystery));
    }

    #[tokio::test]
    async fn unregister_keeps_precision_record() {
        let usdc = token(0x01);
        let registry = registry_with(&[(usdc, 6)]);

        registry.register(usdc).await.unwrap();
        registry.unregister(usdc).unwrap();

        assert!(!registry.is_supported(usdc));
        // Precision survives removal.
        assert_eq!(registry.decimals_of(usdc).await.unwrap(), 6);
        // And the asset stays in the ordered list.
        assert_eq!(registry.list().len(), 2);
    }

    #[tokio::test]
    async fn reregister_restores_support_without_refetch() {
        let usdc = token(0x01);
        let registry = registry_with(&[(usdc, 6)]);

        registry.register(usdc).await.unwrap();
        registry.unregister(usdc).unwrap();
        let decimals = registry.register(usdc).await.unwrap();

        assert_eq!(decimals, 6);
        assert!(registry.is_supported(usdc));
    }

    #[tokio::test]
    async fn unregister_absent_asset_rejected() {
        let registry = registry_with(&[]);
        let result = registry.unregister(token(0x02));
        assert!(matches!(result, Err(RegistryError::NotRegistered(_))));
    }

    #[tokio::test]
    async fn native_cannot_be_unregistered() {
        let registry = registry_with(&[]);
        let result = registry.unregister(AssetId::Native);
        assert!(matches!(result, Err(RegistryError::CannotUnregisterNative)));
    }

    #[tokio::test]
    async fn lazy_decimals_for_unregistered_asset() {
        let dai = token(0x03);
        let registry = registry_with(&[(dai, 18)]);

        // Never registered, but the privileged path may still need it.
        assert!(!registry.is_supported(dai));
        assert_eq!(registry.decimals_of(dai).await.unwrap(), 18);
    }

    #[tokio::test]
    async fn list_preserves_registration_order() {
        let a = token(0x0A);
        let b = token(0x0B);
        let registry = registry_with(&[(a, 6), (b, 8)]);

        registry.register(a).await.unwrap();
        registry.register(b).await.unwrap();

        let listed: Vec<AssetId> = registry.list().iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![AssetId::Native, a, b]);
    }
}

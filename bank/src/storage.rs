//! # BankStore — Snapshot Persistence
//!
//! Snapshot/restore of the bank's persisted-state layout over sled's
//! embedded key-value store. Durability semantics stay with the host --
//! this store exists so a node can come back up with its books intact,
//! not to define the engine's atomicity (the engine is atomic per
//! operation regardless).
//!
//! ## Tree Layout
//!
//! | Tree       | Key                      | Value                  |
//! |------------|--------------------------|------------------------|
//! | `balances` | `owner \| asset` (UTF-8) | balance (16B BE u128)  |
//! | `assets`   | index (4B BE)            | `bincode(AssetRecord)` |
//! | `meta`     | key (UTF-8)              | bytes                  |
//!
//! Asset records are keyed by big-endian index so sled's lexicographic
//! ordering preserves registration order on iteration. The `meta` tree
//! holds the counters, a schema version, and a BLAKE3 checksum of the
//! snapshot payload -- a truncated write should fail loudly on restore,
//! not produce a quietly smaller bank.

use sled::Batch;
use std::path::Path;
use thiserror::Error;

use crate::asset::{AssetId, AssetRecord};
use crate::ledger::Counters;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// BankSnapshot
// ---------------------------------------------------------------------------

/// The persisted-state layout: every balance entry, every asset record
/// in registration order, and the two global counters. Totals are
/// deliberately absent -- they are recomputed from the balances on
/// restore so conservation cannot be corrupted by a bad snapshot.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BankSnapshot {
    /// Every (owner, asset, canonical balance) entry.
    pub balances: Vec<(String, AssetId, u128)>,
    /// Every ever-registered asset record, in registration order.
    pub assets: Vec<AssetRecord>,
    /// The global deposit and withdrawal counters.
    pub counters: Counters,
}

// ---------------------------------------------------------------------------
// Meta Keys
// ---------------------------------------------------------------------------

/// Schema version written on every save; bumped on layout changes.
const SCHEMA_VERSION: u32 = 1;

const META_SCHEMA: &str = "schema_version";
const META_COUNTERS: &str = "counters";
const META_CHECKSUM: &str = "checksum";

/// Separator between owner and asset in balance keys. Owners are hex
/// account strings and assets are `native`/`0x...`, so `|` cannot occur
/// in either half.
const KEY_SEP: u8 = b'|';

// ---------------------------------------------------------------------------
// BankStore
// ---------------------------------------------------------------------------

/// Sled-backed snapshot store.
pub struct BankStore {
    db: sled::Db,
    balances: sled::Tree,
    assets: sled::Tree,
    meta: sled::Tree,
}

impl BankStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Opens an in-memory store that vanishes on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let balances = db.open_tree("balances")?;
        let assets = db.open_tree("assets")?;
        let meta = db.open_tree("meta")?;
        Ok(Self {
            db,
            balances,
            assets,
            meta,
        })
    }

    /// Persists a snapshot, replacing whatever was stored before.
    pub fn save(&self, snapshot: &BankSnapshot) -> StoreResult<()> {
        // The checksum is computed over the canonical (key-ordered) form,
        // because that is the order a later load reconstructs from sled.
        let snapshot = canonical_form(snapshot);
        let payload = bincode::serialize(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let checksum = blake3::hash(&payload);

        self.balances.clear()?;
        self.assets.clear()?;

        let mut balance_batch = Batch::default();
        for (owner, asset, amount) in &snapshot.balances {
            balance_batch.insert(balance_key(owner, *asset), &amount.to_be_bytes());
        }
        self.balances.apply_batch(balance_batch)?;

        let mut asset_batch = Batch::default();
        for (index, record) in snapshot.assets.iter().enumerate() {
            let value = bincode::serialize(record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            asset_batch.insert(&(index as u32).to_be_bytes(), value);
        }
        self.assets.apply_batch(asset_batch)?;

        let counters = bincode::serialize(&snapshot.counters)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut meta_batch = Batch::default();
        meta_batch.insert(META_SCHEMA, &SCHEMA_VERSION.to_be_bytes());
        meta_batch.insert(META_COUNTERS, counters);
        meta_batch.insert(META_CHECKSUM, checksum.as_bytes().as_slice());
        self.meta.apply_batch(meta_batch)?;

        self.db.flush()?;
        tracing::debug!(
            balances = snapshot.balances.len(),
            assets = snapshot.assets.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Loads the stored snapshot, verifying the checksum. Returns
    /// `Ok(None)` when the store has never been written.
    pub fn load(&self) -> StoreResult<Option<BankSnapshot>> {
        let counters_bytes = match self.meta.get(META_COUNTERS)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let counters: Counters = bincode::deserialize(&counters_bytes)
            .map_err(|e| StoreError::Corrupt(format!("counters: {e}")))?;

        let mut balances = Vec::new();
        for entry in self.balances.iter() {
            let (key, value) = entry?;
            let (owner, asset) = parse_balance_key(&key)?;
            let amount = parse_u128(&value)?;
            balances.push((owner, asset, amount));
        }

        let mut assets = Vec::new();
        for entry in self.assets.iter() {
            let (_, value) = entry?;
            let record: AssetRecord = bincode::deserialize(&value)
                .map_err(|e| StoreError::Corrupt(format!("asset record: {e}")))?;
            assets.push(record);
        }

        let snapshot = canonical_form(&BankSnapshot {
            balances,
            assets,
            counters,
        });

        let payload = bincode::serialize(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let expected = blake3::hash(&payload);
        match self.meta.get(META_CHECKSUM)? {
            Some(stored) if stored.as_ref() == expected.as_bytes() => {}
            Some(_) => {
                return Err(StoreError::Corrupt(
                    "checksum mismatch; refusing to restore".to_string(),
                ))
            }
            None => {
                return Err(StoreError::Corrupt(
                    "snapshot present but checksum missing".to_string(),
                ))
            }
        }

        Ok(Some(snapshot))
    }
}

// ---------------------------------------------------------------------------
// Key Helpers
// ---------------------------------------------------------------------------

/// Orders balance entries by their sled key so save-time and load-time
/// serializations agree byte-for-byte.
fn canonical_form(snapshot: &BankSnapshot) -> BankSnapshot {
    let mut canonical = snapshot.clone();
    canonical
        .balances
        .sort_by_key(|(owner, asset, _)| balance_key(owner, *asset));
    canonical
}

fn balance_key(owner: &str, asset: AssetId) -> Vec<u8> {
    let asset_str = asset.to_string();
    let mut key = Vec::with_capacity(owner.len() + 1 + asset_str.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(asset_str.as_bytes());
    key
}

fn parse_balance_key(key: &[u8]) -> StoreResult<(String, AssetId)> {
    let sep = key
        .iter()
        .position(|b| *b == KEY_SEP)
        .ok_or_else(|| StoreError::Corrupt("balance key missing separator".to_string()))?;
    let owner = String::from_utf8(key[..sep].to_vec())
        .map_err(|e| StoreError::Corrupt(format!("balance key owner: {e}")))?;
    let asset_str = std::str::from_utf8(&key[sep + 1..])
        .map_err(|e| StoreError::Corrupt(format!("balance key asset: {e}")))?;
    let asset: AssetId = asset_str
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("balance key asset: {e}")))?;
    Ok((owner, asset))
}

fn parse_u128(value: &[u8]) -> StoreResult<u128> {
    let arr: [u8; 16] = value
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("balance value length {}", value.len())))?;
    Ok(u128::from_be_bytes(arr))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

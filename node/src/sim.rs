//! # Devnet Collaborators
//!
//! In-process stand-ins for the three external surfaces the engine
//! consumes: the price feed, the swap venue, and the asset transfer
//! mechanics. They exist so a devnet node runs end-to-end without a
//! chain attached. In production, each is replaced by a real
//! integration behind the same trait -- the engine cannot tell the
//! difference, which is the point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use aurum_bank::asset::{
    AssetId, AssetMetadata, AssetTransfer, MetadataError, TransferError,
};
use aurum_bank::exchange::{SwapVenue, VenueError};
use aurum_bank::oracle::{FeedError, PriceFeed, RoundData};

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Metadata source reporting fixed decimals for any token and 18 for
/// the native asset. Devnet tokens are all settlement-grade 6-decimal
/// instruments unless stated otherwise.
pub struct SimMetadata;

#[async_trait]
impl AssetMetadata for SimMetadata {
    async fn decimals(&self, asset: AssetId) -> Result<u8, MetadataError> {
        match asset {
            AssetId::Native => Ok(18),
            AssetId::Token(_) => Ok(6),
        }
    }
}

// ---------------------------------------------------------------------------
// Price Feed
// ---------------------------------------------------------------------------

/// A feed with a settable price and a round counter that advances on
/// every read, stamped with the wall clock. Fresh and advancing by
/// construction -- devnet is for exercising the happy path; the trust
/// checks are exercised by the engine's own test suite.
pub struct SimPriceFeed {
    price: Mutex<i128>,
    round: AtomicU64,
}

impl SimPriceFeed {
    /// Creates a feed at the given 8-decimal USD price.
    pub fn new(price: i128) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(price),
            round: AtomicU64::new(1),
        })
    }

    /// Adjusts the reported price. Handy for poking at the cap from a
    /// devnet shell.
    pub fn set_price(&self, price: i128) {
        *self.price.lock() = price;
    }
}

#[async_trait]
impl PriceFeed for SimPriceFeed {
    async fn latest_round_data(&self) -> Result<RoundData, FeedError> {
        let round_id = self.round.fetch_add(1, Ordering::Relaxed);
        Ok(RoundData {
            round_id,
            answer: *self.price.lock(),
            updated_at: chrono::Utc::now().timestamp().max(0) as u64,
            answered_in_round: round_id,
        })
    }

    fn decimals(&self) -> u8 {
        8
    }
}

// ---------------------------------------------------------------------------
// Transfer Agent
// ---------------------------------------------------------------------------

/// In-memory token accounting: account -> asset -> raw balance. Devnet
/// accounts are faucet-funded via [`SimTransferAgent::mint`].
pub struct SimTransferAgent {
    custody: String,
    balances: DashMap<(String, AssetId), u128>,
}

impl SimTransferAgent {
    /// Creates an agent whose pulls land in `custody`.
    pub fn new(custody: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            custody: custody.into(),
            balances: DashMap::new(),
        })
    }

    /// Faucet: credits raw units to an account out of thin air.
    pub fn mint(&self, account: &str, asset: AssetId, amount: u128) {
        *self
            .balances
            .entry((account.to_string(), asset))
            .or_insert(0) += amount;
    }

    /// An account's raw holding of an asset.
    pub fn holding(&self, account: &str, asset: AssetId) -> u128 {
        self.balances
            .get(&(account.to_string(), asset))
            .map(|v| *v)
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        asset: AssetId,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), TransferError> {
        let mut source = self
            .balances
            .entry((from.to_string(), asset))
            .or_insert(0);
        if *source < amount {
            return Err(TransferError::InsufficientBalance {
                asset,
                requested: amount,
            });
        }
        *source -= amount;
        drop(source);
        *self.balances.entry((to.to_string(), asset)).or_insert(0) += amount;
        Ok(())
    }
}

#[async_trait]
impl AssetTransfer for SimTransferAgent {
    async fn pull(&self, asset: AssetId, from: &str, amount: u128) -> Result<(), TransferError> {
        self.transfer(asset, from, &self.custody, amount)
    }

    async fn push(&self, asset: AssetId, to: &str, amount: u128) -> Result<(), TransferError> {
        self.transfer(asset, &self.custody, to, amount)
    }
}

// ---------------------------------------------------------------------------
// Swap Venue
// ---------------------------------------------------------------------------

/// A venue that quotes at par and fills at a configurable rate (in bps
/// of the quote), minting the output to the recipient through the
/// transfer agent. 9_950 bps models a realistic half-percent of fees
/// and impact.
pub struct SimVenue {
    transfers: Arc<SimTransferAgent>,
    fill_rate_bps: Mutex<u128>,
}

impl SimVenue {
    /// Creates a venue filling at `fill_rate_bps` of the quoted output.
    pub fn new(transfers: Arc<SimTransferAgent>, fill_rate_bps: u128) -> Arc<Self> {
        Arc::new(Self {
            transfers,
            fill_rate_bps: Mutex::new(fill_rate_bps),
        })
    }
}

#[async_trait]
impl SwapVenue for SimVenue {
    async fn get_amounts_out(
        &self,
        amount_in: u128,
        path: &[AssetId],
    ) -> Result<Vec<u128>, VenueError> {
        let mut amounts = vec![amount_in];
        for _ in 1..path.len() {
            amounts.push(amount_in);
        }
        Ok(amounts)
    }

    async fn swap_exact_tokens_for_tokens(
        &self,
        amount_in: u128,
        amount_out_min: u128,
        path: &[AssetId],
        recipient: &str,
        _deadline: u64,
    ) -> Result<Vec<u128>, VenueError> {
        let out = amount_in * *self.fill_rate_bps.lock() / 10_000;
        if out < amount_out_min {
            return Err(VenueError::CallFailed(format!(
                "insufficient output: {out} < {amount_out_min}"
            )));
        }
        let settlement = *path.last().ok_or_else(|| {
            VenueError::CallFailed("empty conversion path".to_string())
        })?;
        self.transfers.mint(recipient, settlement, out);
        Ok(vec![amount_in, out])
    }
}

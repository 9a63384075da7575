//! # The Ledger Book
//!
//! Per-owner, per-asset balances in canonical precision, plus the per-asset
//! totals and the two global operation counters. This is the only place
//! balances are mutated, and every mutation maintains the conservation
//! invariant: for each asset, the sum of owner balances equals the asset
//! total, after every operation, no exceptions.
//!
//! Capacity is NOT checked here. The pipelines run the [`CapacityGuard`]
//! before every credit, inside the same operation scope -- re-checking in
//! the book would double-read the total under a different interleaving
//! and hide ordering bugs instead of surfacing them.
//!
//! [`CapacityGuard`]: super::capacity::CapacityGuard

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from balance mutations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Attempted to debit more than the owner holds.
    #[error(
        "insufficient balance: available {available}, requested {requested} (asset {asset})"
    )]
    InsufficientBalance {
        /// The asset that was being debited.
        asset: AssetId,
        /// The owner's current balance.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Arithmetic overflow during a credit.
    ///
    /// Canonical amounts are capacity-bounded far below `u128::MAX`, so
    /// hitting this means a caller skipped the guard. That's a bug, and
    /// the ledger refuses to paper over it.
    #[error("balance overflow: current {current}, credit {credit} (asset {asset})")]
    Overflow {
        /// The asset that was being credited.
        asset: AssetId,
        /// The balance before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// The two global operation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Total successful credits since construction (or restore).
    pub deposits: u64,
    /// Total successful debits since construction (or restore).
    pub withdrawals: u64,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The balance book. Plain data with `&mut` mutation -- thread safety is
/// the bank's job (a `parking_lot::RwLock` around the whole book), the
/// same split the wallet/balance-sheet layers use.
#[derive(Default)]
pub struct Ledger {
    /// owner -> asset -> canonical balance.
    balances: HashMap<String, HashMap<AssetId, u128>>,
    /// asset -> canonical total across all owners. Entries persist at
    /// zero once created, so unregistered assets keep their slot.
    totals: HashMap<AssetId, u128>,
    counters: Counters,
}

impl Ledger {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an owner's balance and the asset total.
    ///
    /// The caller must have run the capacity check in the same operation.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Overflow`] when either the owner balance or the
    /// asset total would exceed `u128::MAX`.
    pub fn credit(
        &mut self,
        owner: &str,
        asset: AssetId,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        let current = self.balance_of(owner, asset);
        let current_total = self.asset_total(asset);

        let new_balance = current.checked_add(amount).ok_or(LedgerError::Overflow {
            asset,
            current,
            credit: amount,
        })?;
        let new_total = current_total
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                asset,
                current: current_total,
                credit: amount,
            })?;

        // Both additions verified before either map is touched, so a
        // failed credit leaves no half-applied state behind.
        self.balances
            .entry(owner.to_string())
            .or_default()
            .insert(asset, new_balance);
        self.totals.insert(asset, new_total);
        self.counters.deposits += 1;

        Ok(new_balance)
    }

    /// Debits an owner's balance and the asset total.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] when the owner holds less
    /// than `amount`.
    pub fn debit(
        &mut self,
        owner: &str,
        asset: AssetId,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        let available = self.balance_of(owner, asset);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                available,
                requested: amount,
            });
        }

        // available >= amount, and conservation means the asset total
        // always covers the owner's share, so both subtractions are in
        // range.
        let new_balance = available - amount;
        self.balances
            .entry(owner.to_string())
            .or_default()
            .insert(asset, new_balance);
        let new_total = self.asset_total(asset) - amount;
        self.totals.insert(asset, new_total);
        self.counters.withdrawals += 1;

        Ok(new_balance)
    }

    /// Reverses a debit whose payout failed downstream. Restores the
    /// balance and the asset total and rolls the withdrawal counter back
    /// -- as far as the book is concerned the operation never happened.
    ///
    /// Only callable with the amount of the debit being reversed, so the
    /// additions cannot overflow: the value was subtracted moments ago.
    pub fn revert_debit(&mut self, owner: &str, asset: AssetId, amount: u128) {
        let restored = self.balance_of(owner, asset) + amount;
        self.balances
            .entry(owner.to_string())
            .or_default()
            .insert(asset, restored);
        let total = self.asset_total(asset) + amount;
        self.totals.insert(asset, total);
        self.counters.withdrawals = self.counters.withdrawals.saturating_sub(1);
    }

    /// The authoritative bank-wide figure: the sum of per-asset totals
    /// across every ever-registered asset, including unregistered ones
    /// still holding balance. Never fails; totals are capacity-bounded.
    pub fn total_value(&self) -> u128 {
        self.totals.values().fold(0u128, |acc, t| acc.saturating_add(*t))
    }

    /// An owner's balance for one asset. Zero when absent, never fails.
    pub fn balance_of(&self, owner: &str, asset: AssetId) -> u128 {
        self.balances
            .get(owner)
            .and_then(|m| m.get(&asset))
            .copied()
            .unwrap_or(0)
    }

    /// All of an owner's non-zero balances.
    pub fn balances_of(&self, owner: &str) -> Vec<(AssetId, u128)> {
        let mut entries: Vec<(AssetId, u128)> = self
            .balances
            .get(owner)
            .map(|m| {
                m.iter()
                    .filter(|(_, amount)| **amount > 0)
                    .map(|(asset, amount)| (*asset, *amount))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by_key(|(asset, _)| *asset);
        entries
    }

    /// The total held for one asset across all owners.
    pub fn asset_total(&self, asset: AssetId) -> u128 {
        self.totals.get(&asset).copied().unwrap_or(0)
    }

    /// The global operation counters.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    // -----------------------------------------------------------------------
    // Snapshot Support
    // -----------------------------------------------------------------------

    /// Every (owner, asset, balance) entry, for snapshotting.
    pub fn entries(&self) -> Vec<(String, AssetId, u128)> {
        let mut out = Vec::new();
        for (owner, assets) in &self.balances {
            for (asset, amount) in assets {
                out.push((owner.clone(), *asset, *amount));
            }
        }
        out.sort();
        out
    }

    /// Every (asset, total) entry, for snapshotting.
    pub fn totals(&self) -> Vec<(AssetId, u128)> {
        let mut out: Vec<(AssetId, u128)> =
            self.totals.iter().map(|(a, t)| (*a, *t)).collect();
        out.sort_by_key(|(asset, _)| *asset);
        out
    }

    /// Rebuilds a book from snapshot entries. Totals are recomputed from
    /// the balance entries rather than trusted from the snapshot --
    /// conservation is an invariant, not an input.
    pub fn restore(entries: Vec<(String, AssetId, u128)>, counters: Counters) -> Self {
        let mut book = Self {
            counters,
            ..Self::default()
        };
        for (owner, asset, amount) in entries {
            *book
                .balances
                .entry(owner)
                .or_default()
                .entry(asset)
                .or_insert(0) += amount;
            *book.totals.entry(asset).or_insert(0) += amount;
        }
        book
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! # The Bank
//!
//! Composition root for the engine: one [`Bank`] owns the asset registry,
//! the oracle gateway, the ledger and its capacity guard, the exchange
//! adapter, and the transfer capability, all behind a single operation
//! entry flag.
//!
//! Construction wires the collaborators together and pre-registers the
//! settlement asset; after that the only ways in are the pipeline
//! operations (see [`super::pipeline`]), the admin operations, and the
//! read-only views below. Extensions compose against this surface -- they
//! hold a `Bank` and call it, they do not reach into its state.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::{AssetId, AssetMetadata, AssetRecord, AssetRegistry, AssetTransfer};
use crate::config::ORACLE_HEARTBEAT;
use crate::exchange::{ExchangeAdapter, SwapPath, SwapVenue};
use crate::ledger::{CapacityGuard, Counters, Ledger, Limits};
use crate::oracle::{PriceFeed, PriceOracleGateway, PriceQuote};
use crate::storage::BankSnapshot;

use super::guard::EntryFlag;
use super::BankError;

// ---------------------------------------------------------------------------
// BankConfig
// ---------------------------------------------------------------------------

/// Construction-time parameters. All of these are immutable for the life
/// of the bank -- changing limits or the settlement asset is a redeploy.
#[derive(Clone, Debug)]
pub struct BankConfig {
    /// The only account allowed to call admin operations.
    pub admin: String,
    /// The bank's own custody account, used as the recipient of venue
    /// conversions and the source of outbound payouts.
    pub custody_account: String,
    /// The asset every conversion settles into.
    pub settlement_asset: AssetId,
    /// Bank cap and per-operation withdrawal ceiling.
    pub limits: Limits,
    /// Maximum tolerated oracle answer age.
    pub oracle_heartbeat: Duration,
}

impl BankConfig {
    /// A config with the stock heartbeat; the rest is caller-supplied.
    pub fn new(
        admin: impl Into<String>,
        custody_account: impl Into<String>,
        settlement_asset: AssetId,
        limits: Limits,
    ) -> Self {
        Self {
            admin: admin.into(),
            custody_account: custody_account.into(),
            settlement_asset,
            limits,
            oracle_heartbeat: ORACLE_HEARTBEAT,
        }
    }
}

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

/// The custodial multi-asset bank engine.
pub struct Bank {
    admin: String,
    custody: String,
    settlement: AssetId,
    pub(super) registry: AssetRegistry,
    pub(super) oracle: PriceOracleGateway,
    pub(super) adapter: ExchangeAdapter,
    pub(super) transfers: Arc<dyn AssetTransfer>,
    pub(super) ledger: RwLock<Ledger>,
    pub(super) guard: CapacityGuard,
    pub(super) entry: EntryFlag,
}

impl Bank {
    /// Wires up a bank. Pre-registers the settlement asset so its
    /// precision is on file before the first conversion arrives.
    ///
    /// # Errors
    ///
    /// [`BankError::Registry`] when the settlement asset's metadata
    /// source cannot supply a precision -- a bank that cannot value its
    /// own settlement asset does not get to open.
    pub async fn new(
        config: BankConfig,
        metadata: Arc<dyn AssetMetadata>,
        feed: Arc<dyn PriceFeed>,
        venue: Arc<dyn SwapVenue>,
        transfers: Arc<dyn AssetTransfer>,
    ) -> Result<Self, BankError> {
        let registry = AssetRegistry::new(metadata);
        if !config.settlement_asset.is_native() {
            registry.register(config.settlement_asset).await?;
        }

        let bank = Self {
            admin: config.admin,
            custody: config.custody_account,
            settlement: config.settlement_asset,
            registry,
            oracle: PriceOracleGateway::new(feed, config.oracle_heartbeat),
            adapter: ExchangeAdapter::new(venue, config.settlement_asset),
            transfers,
            ledger: RwLock::new(Ledger::new()),
            guard: CapacityGuard::new(config.limits),
            entry: EntryFlag::new(),
        };

        tracing::info!(
            settlement = %bank.settlement,
            bank_cap = bank.guard.limits().bank_cap,
            withdrawal_ceiling = bank.guard.limits().withdrawal_ceiling,
            "bank constructed"
        );
        Ok(bank)
    }

    /// The bank's custody account id.
    pub fn custody_account(&self) -> &str {
        &self.custody
    }

    /// The configured settlement asset.
    pub fn settlement_asset(&self) -> AssetId {
        self.settlement
    }

    /// The construction-time limits.
    pub fn limits(&self) -> Limits {
        self.guard.limits()
    }

    pub(super) fn authorize(&self, caller: &str) -> Result<(), BankError> {
        if caller != self.admin {
            return Err(BankError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Admin Operations
    // -----------------------------------------------------------------------

    /// Registers an asset for deposit. Admin only.
    pub async fn register_asset(&self, caller: &str, asset: AssetId) -> Result<u8, BankError> {
        self.authorize(caller)?;
        Ok(self.registry.register(asset).await?)
    }

    /// Clears an asset's supported flag. Admin only. Balances and the
    /// precision record persist.
    pub fn unregister_asset(&self, caller: &str, asset: AssetId) -> Result<(), BankError> {
        self.authorize(caller)?;
        Ok(self.registry.unregister(asset)?)
    }

    /// Replaces the oracle feed source. Admin only.
    pub fn set_oracle_source(
        &self,
        caller: &str,
        feed: Arc<dyn PriceFeed>,
    ) -> Result<(), BankError> {
        self.authorize(caller)?;
        self.oracle.set_source(feed);
        Ok(())
    }

    /// Configures a conversion route for an input asset. Admin only.
    pub fn set_conversion_route(
        &self,
        caller: &str,
        asset: AssetId,
        path: SwapPath,
    ) -> Result<(), BankError> {
        self.authorize(caller)?;
        Ok(self.adapter.set_route(asset, path)?)
    }

    /// Removes a conversion route, making the asset unquotable. Admin
    /// only. This -- not unregistering the settlement asset -- is the
    /// lever for stopping conversions.
    pub fn clear_conversion_route(&self, caller: &str, asset: AssetId) -> Result<(), BankError> {
        self.authorize(caller)?;
        self.adapter.clear_route(asset);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// An owner's canonical balance for one asset. Never fails.
    pub fn balance_of(&self, owner: &str, asset: AssetId) -> u128 {
        self.ledger.read().balance_of(owner, asset)
    }

    /// All of an owner's non-zero balances.
    pub fn balances_of(&self, owner: &str) -> Vec<(AssetId, u128)> {
        self.ledger.read().balances_of(owner)
    }

    /// The aggregate canonical value held across all assets.
    pub fn total_value(&self) -> u128 {
        self.ledger.read().total_value()
    }

    /// Remaining headroom under the bank cap.
    pub fn available_capacity(&self) -> u128 {
        self.guard.available_capacity(self.total_value())
    }

    /// A freshly validated price quote. Never cached.
    pub async fn current_price(&self) -> Result<PriceQuote, BankError> {
        Ok(self.oracle.latest_price().await?)
    }

    /// Whether deposits of the asset are currently accepted.
    pub fn is_supported(&self, asset: AssetId) -> bool {
        self.registry.is_supported(asset)
    }

    /// Every ever-registered asset record, in registration order.
    pub fn list_assets(&self) -> Vec<AssetRecord> {
        self.registry.list()
    }

    /// Whether a conversion route is configured for the asset.
    pub fn has_conversion_route(&self, asset: AssetId) -> bool {
        self.adapter.has_route(asset)
    }

    /// The global deposit and withdrawal counters.
    pub fn counters(&self) -> Counters {
        self.ledger.read().counters()
    }

    // -----------------------------------------------------------------------
    // Snapshot Support
    // -----------------------------------------------------------------------

    /// Captures the persisted-state layout: balances, asset records, and
    /// counters. Totals are derived, not captured -- conservation is
    /// recomputed on restore.
    pub fn snapshot(&self) -> BankSnapshot {
        let ledger = self.ledger.read();
        BankSnapshot {
            balances: ledger.entries(),
            assets: self.registry.list(),
            counters: ledger.counters(),
        }
    }

    /// Replaces the ledger and seeds the registry from a snapshot.
    /// Intended for startup, before the bank is serving operations.
    pub fn restore_snapshot(&self, snapshot: BankSnapshot) {
        self.registry.load_records(snapshot.assets);
        *self.ledger.write() = Ledger::restore(snapshot.balances, snapshot.counters);
        tracing::info!(total_value = %self.total_value(), "bank state restored from snapshot");
    }
}

//! # Asset Transfer Capability
//!
//! The bank never moves tokens itself -- it asks an [`AssetTransfer`]
//! collaborator to pull value in from an owner or push value back out.
//! In production this wraps the host chain's transfer mechanics; in tests
//! and on devnet it is an in-memory simulation.
//!
//! The trait is deliberately tiny: two verbs, one error taxonomy. The
//! pipelines treat any failure as grounds for a total abort of the
//! surrounding operation.

use async_trait::async_trait;
use thiserror::Error;

use super::id::AssetId;

/// Errors a transfer agent can report.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source account does not hold enough of the asset.
    #[error("transfer failed: insufficient balance for {asset} (requested {requested})")]
    InsufficientBalance {
        /// The asset that was being moved.
        asset: AssetId,
        /// The amount that was requested.
        requested: u128,
    },

    /// The source account has not granted the bank a sufficient allowance.
    #[error("transfer failed: insufficient allowance for {asset} (requested {requested})")]
    InsufficientAllowance {
        /// The asset that was being moved.
        asset: AssetId,
        /// The amount that was requested.
        requested: u128,
    },

    /// The transfer surface itself failed (reverted, timed out, vanished).
    #[error("transfer call failed: {0}")]
    CallFailed(String),
}

/// Moves asset amounts between external accounts and the bank's custody.
///
/// Amounts are in the asset's own native smallest units, not canonical
/// units -- the ledger is the only place canonical amounts live.
#[async_trait]
pub trait AssetTransfer: Send + Sync {
    /// Pulls `amount` of `asset` from `from` into the bank's custody.
    async fn pull(&self, asset: AssetId, from: &str, amount: u128) -> Result<(), TransferError>;

    /// Pushes `amount` of `asset` from the bank's custody to `to`.
    async fn push(&self, asset: AssetId, to: &str, amount: u128) -> Result<(), TransferError>;
}

//! # Bank Module — Pipelines, Guard & Receipts
//!
//! The orchestration layer. Everything below this module is a component
//! with one job; this is where they compose into the five public
//! operations and their abort semantics.
//!
//! ```text
//! engine.rs     — the Bank: construction, admin operations, views
//! pipeline.rs   — deposit / conversion / withdrawal pipelines
//! operation.rs  — operation state machine and receipts
//! guard.rs      — the single in-flight entry flag
//! ```

use thiserror::Error;

use crate::asset::{AssetId, RegistryError, TransferError};
use crate::exchange::ExchangeError;
use crate::ledger::{CapacityError, LedgerError};
use crate::normalize::NormalizeError;
use crate::oracle::OracleError;

pub mod engine;
pub mod guard;
pub mod operation;
pub mod pipeline;

pub use engine::{Bank, BankConfig};
pub use operation::{
    ConversionReceipt, DepositReceipt, OperationKind, OperationState, OperationTrace,
    WithdrawalReceipt,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Top-level error for the public operations. Component failures pass
/// through transparently so callers can match on the specific reason --
/// "try again later" (stale price), "adjust your input" (capacity,
/// slippage), and "not supported" are different answers, not one generic
/// failure.
#[derive(Debug, Error)]
pub enum BankError {
    /// Zero-amount operations are no-ops and almost certainly caller
    /// bugs; they are rejected before anything else runs.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// The amount normalizes to zero canonical value (or a zero payout).
    #[error("amount {amount} is below the smallest representable canonical value")]
    DustAmount {
        /// The offending amount, in the units the caller supplied.
        amount: u128,
    },

    /// The caller is not the bank admin.
    #[error("caller {caller} is not authorized for admin operations")]
    Unauthorized {
        /// Who tried.
        caller: String,
    },

    /// Another operation is already in flight on this bank. Re-entrant
    /// calls from collaborator callbacks land here.
    #[error("another operation is in flight")]
    OperationInFlight,

    /// The asset is not currently supported for this operation.
    #[error("asset {0} is not supported")]
    UnsupportedAsset(AssetId),

    /// Native currency must use the native deposit/withdrawal pipelines.
    #[error("the native currency uses the native-currency pipelines")]
    NativeViaTokenPath,

    /// Normalization arithmetic failed.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Asset registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Oracle trust failure.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Ledger mutation failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Capacity or withdrawal-limit failure.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// Exchange adapter failure.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// Asset transfer failure.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

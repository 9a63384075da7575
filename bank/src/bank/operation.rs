//! # Operation Lifecycle & Receipts
//!
//! Every public operation moves through a fixed sequence of states, and
//! any failure at any state aborts the whole thing:
//!
//! ```text
//!   Validating ──► Quoting ──► TransferringIn ──► Converting ──┐
//!       │             (optional stages, per operation kind)    │
//!       │                                                      ▼
//!       └──────────────────────────► Booking (credit/debit) ──► Emitting ──► Done
//!
//!   any state ──► Aborted   (terminal; no partial effects persist)
//! ```
//!
//! The trace exists for observability and for enforcing that state only
//! moves forward. Terminal states are immutable -- a finished operation
//! cannot be revived by a late callback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Which public operation a trace belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Native-currency deposit valued at the oracle price.
    NativeDeposit,
    /// Registered-asset deposit valued by direct decimal scaling.
    AssetDeposit,
    /// Deposit composed with a venue conversion into the settlement asset.
    ConversionDeposit,
    /// Native-currency withdrawal paid out at the oracle price.
    NativeWithdrawal,
    /// Registered-asset withdrawal paid out by exact up-scaling.
    AssetWithdrawal,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeDeposit => write!(f, "NativeDeposit"),
            Self::AssetDeposit => write!(f, "AssetDeposit"),
            Self::ConversionDeposit => write!(f, "ConversionDeposit"),
            Self::NativeWithdrawal => write!(f, "NativeWithdrawal"),
            Self::AssetWithdrawal => write!(f, "AssetWithdrawal"),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationState
// ---------------------------------------------------------------------------

/// Lifecycle state of a single operation. Ordered: state only advances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationState {
    /// Input validation and limit checks.
    Validating,
    /// Fetching the advisory quote and validating slippage.
    Quoting,
    /// Pulling the input asset from the caller.
    TransferringIn,
    /// Executing the venue conversion.
    Converting,
    /// Mutating the ledger (credit or debit).
    Booking,
    /// Building the receipt and recording counters.
    Emitting,
    /// Terminal: completed successfully.
    Done,
    /// Terminal: aborted with no persisted effects.
    Aborted,
}

impl OperationState {
    /// Returns `true` for the two terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

// ---------------------------------------------------------------------------
// OperationTrace
// ---------------------------------------------------------------------------

/// Tracks one operation from entry to terminal state.
pub struct OperationTrace {
    id: Uuid,
    kind: OperationKind,
    state: OperationState,
    started_at: Instant,
}

impl OperationTrace {
    /// Begins a trace in `Validating`.
    pub fn begin(kind: OperationKind) -> Self {
        let trace = Self {
            id: Uuid::new_v4(),
            kind,
            state: OperationState::Validating,
            started_at: Instant::now(),
        };
        tracing::debug!(operation = %trace.id, kind = %kind, "operation started");
        trace
    }

    /// The operation id stamped on the eventual receipt.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The current state.
    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Advances to `next`. Backward moves and moves out of a terminal
    /// state are ignored -- late transitions from stale callbacks must
    /// not resurrect a finished operation.
    pub fn advance(&mut self, next: OperationState) {
        if self.state.is_terminal() || next <= self.state {
            return;
        }
        tracing::trace!(
            operation = %self.id,
            from = ?self.state,
            to = ?next,
            "operation state"
        );
        self.state = next;
    }

    /// Marks the operation aborted. Idempotent; no effect once `Done`.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        tracing::debug!(
            operation = %self.id,
            kind = %self.kind,
            at = ?self.state,
            "operation aborted"
        );
        self.state = OperationState::Aborted;
    }

    /// Marks the operation done and returns its total latency.
    pub fn finish(&mut self) -> std::time::Duration {
        if !self.state.is_terminal() {
            self.state = OperationState::Done;
        }
        let elapsed = self.started_at.elapsed();
        tracing::debug!(
            operation = %self.id,
            kind = %self.kind,
            elapsed_ms = elapsed.as_millis() as u64,
            "operation done"
        );
        elapsed
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Receipt for a completed deposit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Operation id from the trace.
    pub operation_id: Uuid,
    /// The account that was credited.
    pub owner: String,
    /// The asset that was deposited.
    pub asset: AssetId,
    /// The deposited amount in the asset's native units.
    pub amount_in: u128,
    /// The canonical value credited to the ledger.
    pub value: u128,
    /// The owner's balance for `asset` after the credit.
    pub new_balance: u128,
    /// Global deposit counter after this operation.
    pub deposit_seq: u64,
    /// When the credit was booked (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Receipt for a completed withdrawal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// Operation id from the trace.
    pub operation_id: Uuid,
    /// The account that was debited.
    pub owner: String,
    /// The asset that was withdrawn.
    pub asset: AssetId,
    /// The canonical value debited from the ledger.
    pub value: u128,
    /// The payout in the asset's native units.
    pub amount_out: u128,
    /// The owner's balance for `asset` after the debit.
    pub new_balance: u128,
    /// Global withdrawal counter after this operation.
    pub withdrawal_seq: u64,
    /// When the debit was booked (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Receipt for a completed conversion deposit. Carries both the advisory
/// and the realized output so callers can see the slippage they ate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionReceipt {
    /// Operation id from the trace.
    pub operation_id: Uuid,
    /// The account that was credited.
    pub owner: String,
    /// The asset that was pulled in and converted.
    pub input_asset: AssetId,
    /// The input amount in the input asset's native units.
    pub amount_in: u128,
    /// The advisory quote at validation time. Informational only.
    pub expected_out: u128,
    /// What the venue actually delivered, in settlement-asset units.
    /// This -- and only this -- is what the credit was computed from.
    pub realized_out: u128,
    /// The asset the conversion settled into.
    pub settlement_asset: AssetId,
    /// The canonical value credited to the ledger.
    pub value: u128,
    /// The owner's settlement-asset balance after the credit.
    pub new_balance: u128,
    /// Global deposit counter after this operation.
    pub deposit_seq: u64,
    /// When the credit was booked (UTC).
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! # Deposit & Withdrawal Pipelines
//!
//! The five public operations, each a staged pipeline over the bank's
//! components. Three rules hold everywhere:
//!
//! 1. **Checks, then effects, then interactions** -- every
//!    balance-affecting check (capacity, ceiling, slippage) runs before
//!    any external call an interleaved invocation could influence, and
//!    the ledger mutation is the last state change before the receipt.
//!    Deposits necessarily pull value in before crediting it; the credit
//!    still comes last.
//! 2. **Realized, never advisory** -- the number credited after a
//!    conversion is what the venue delivered, not what it quoted.
//! 3. **Total abort** -- any failure leaves the ledger untouched and
//!    pulled-in value returned. There is no partial credit, ever.
//!
//! The entry permit is held across every stage, external calls included,
//! so a collaborator that calls back into the bank mid-operation hits
//! [`BankError::OperationInFlight`] instead of interleaved state.

use chrono::Utc;

use crate::asset::AssetId;
use crate::config::CANONICAL_DECIMALS;
use crate::exchange::ExchangeError;
use crate::normalize;

use super::engine::Bank;
use super::operation::{
    ConversionReceipt, DepositReceipt, OperationKind, OperationState, OperationTrace,
    WithdrawalReceipt,
};
use super::BankError;

impl Bank {
    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Deposits native currency, valued at a fresh oracle price.
    pub async fn deposit_native(
        &self,
        owner: &str,
        amount: u128,
    ) -> Result<DepositReceipt, BankError> {
        let mut trace = OperationTrace::begin(OperationKind::NativeDeposit);
        let result = self.deposit_native_inner(owner, amount, &mut trace).await;
        Self::seal(&mut trace, &result);
        result
    }

    async fn deposit_native_inner(
        &self,
        owner: &str,
        amount: u128,
        trace: &mut OperationTrace,
    ) -> Result<DepositReceipt, BankError> {
        if amount == 0 {
            return Err(BankError::ZeroAmount);
        }
        let _permit = self.entry.enter().ok_or(BankError::OperationInFlight)?;

        // Fresh price on every operation; the gateway has already run the
        // trust checks by the time we see a quote.
        let quote = self.oracle.latest_price().await?;
        let value = normalize::native_to_canonical(amount, quote.price, quote.decimals)?;
        if value == 0 {
            return Err(BankError::DustAmount { amount });
        }
        self.guard
            .check_deposit(value, self.ledger.read().total_value())?;

        trace.advance(OperationState::TransferringIn);
        self.transfers
            .pull(AssetId::Native, owner, amount)
            .await?;

        trace.advance(OperationState::Booking);
        let (new_balance, deposit_seq) =
            match self.credit_checked(owner, AssetId::Native, value) {
                Ok(booked) => booked,
                Err(e) => {
                    self.return_to_owner(AssetId::Native, owner, amount).await;
                    return Err(e);
                }
            };

        trace.advance(OperationState::Emitting);
        tracing::info!(owner, amount, value, "native deposit credited");
        Ok(DepositReceipt {
            operation_id: trace.id(),
            owner: owner.to_string(),
            asset: AssetId::Native,
            amount_in: amount,
            value,
            new_balance,
            deposit_seq,
            timestamp: Utc::now(),
        })
    }

    /// Deposits a registered asset, valued by direct decimal scaling.
    pub async fn deposit_asset(
        &self,
        owner: &str,
        asset: AssetId,
        amount: u128,
    ) -> Result<DepositReceipt, BankError> {
        let mut trace = OperationTrace::begin(OperationKind::AssetDeposit);
        let result = self
            .deposit_asset_inner(owner, asset, amount, &mut trace)
            .await;
        Self::seal(&mut trace, &result);
        result
    }

    async fn deposit_asset_inner(
        &self,
        owner: &str,
        asset: AssetId,
        amount: u128,
        trace: &mut OperationTrace,
    ) -> Result<DepositReceipt, BankError> {
        if amount == 0 {
            return Err(BankError::ZeroAmount);
        }
        if asset.is_native() {
            return Err(BankError::NativeViaTokenPath);
        }
        if !self.registry.is_supported(asset) {
            return Err(BankError::UnsupportedAsset(asset));
        }
        let _permit = self.entry.enter().ok_or(BankError::OperationInFlight)?;

        let decimals = self.registry.decimals_of(asset).await?;
        let value = normalize::normalize(amount, decimals, CANONICAL_DECIMALS)?;
        if value == 0 {
            return Err(BankError::DustAmount { amount });
        }
        self.guard
            .check_deposit(value, self.ledger.read().total_value())?;

        trace.advance(OperationState::TransferringIn);
        self.transfers.pull(asset, owner, amount).await?;

        trace.advance(OperationState::Booking);
        let (new_balance, deposit_seq) = match self.credit_checked(owner, asset, value) {
            Ok(booked) => booked,
            Err(e) => {
                self.return_to_owner(asset, owner, amount).await;
                return Err(e);
            }
        };

        trace.advance(OperationState::Emitting);
        tracing::info!(owner, %asset, amount, value, "asset deposit credited");
        Ok(DepositReceipt {
            operation_id: trace.id(),
            owner: owner.to_string(),
            asset,
            amount_in: amount,
            value,
            new_balance,
            deposit_seq,
            timestamp: Utc::now(),
        })
    }

    /// Deposits an arbitrary routable asset by converting it into the
    /// settlement asset first, atomically with the credit.
    ///
    /// The advisory quote gates slippage before any value moves; the
    /// credit is computed from the realized output alone. The settlement
    /// slot is credited through the privileged path: capacity is
    /// re-checked against the realized value, the supported flag is not.
    pub async fn deposit_with_conversion(
        &self,
        owner: &str,
        asset: AssetId,
        amount: u128,
        minimum_out: u128,
        deadline: u64,
    ) -> Result<ConversionReceipt, BankError> {
        let mut trace = OperationTrace::begin(OperationKind::ConversionDeposit);
        let result = self
            .deposit_with_conversion_inner(owner, asset, amount, minimum_out, deadline, &mut trace)
            .await;
        Self::seal(&mut trace, &result);
        result
    }

    async fn deposit_with_conversion_inner(
        &self,
        owner: &str,
        asset: AssetId,
        amount: u128,
        minimum_out: u128,
        deadline: u64,
        trace: &mut OperationTrace,
    ) -> Result<ConversionReceipt, BankError> {
        if amount == 0 {
            return Err(BankError::ZeroAmount);
        }
        if asset.is_native() {
            return Err(BankError::NativeViaTokenPath);
        }
        let _permit = self.entry.enter().ok_or(BankError::OperationInFlight)?;

        trace.advance(OperationState::Quoting);
        let quote = self.adapter.quote(asset, amount).await?;
        if quote.expected_out == 0 {
            return Err(ExchangeError::NoConversionRoute(asset).into());
        }
        self.adapter
            .validate_slippage(quote.expected_out, minimum_out)?;

        let settlement = self.settlement_asset();
        let settlement_decimals = self.registry.decimals_of(settlement).await?;

        // Early capacity exit against the advisory estimate: if even the
        // quoted output cannot fit, don't spend the swap. The realized
        // value is re-checked before the credit.
        let estimated_value =
            normalize::normalize(quote.expected_out, settlement_decimals, CANONICAL_DECIMALS)?;
        self.guard
            .check_deposit(estimated_value, self.ledger.read().total_value())?;

        trace.advance(OperationState::TransferringIn);
        self.transfers.pull(asset, owner, amount).await?;

        trace.advance(OperationState::Converting);
        let swap = match self
            .adapter
            .convert(asset, amount, minimum_out, self.custody_account(), deadline)
            .await
        {
            Ok(swap) => swap,
            Err(e) => {
                // The conversion never happened; hand the pulled input
                // back. Abort must be total.
                self.return_to_owner(asset, owner, amount).await;
                return Err(e.into());
            }
        };

        // From here on the input is spent and the realized settlement
        // units sit in custody; every abort path hands those to the
        // owner instead.
        let value =
            match normalize::normalize(swap.realized_out, settlement_decimals, CANONICAL_DECIMALS)
            {
                Ok(value) => value,
                Err(e) => {
                    self.return_to_owner(settlement, owner, swap.realized_out).await;
                    return Err(e.into());
                }
            };
        if value == 0 {
            self.return_to_owner(settlement, owner, swap.realized_out).await;
            return Err(BankError::DustAmount { amount });
        }
        let total_value = self.ledger.read().total_value();
        if let Err(e) = self.guard.check_deposit(value, total_value) {
            self.return_to_owner(settlement, owner, swap.realized_out).await;
            return Err(e.into());
        }

        trace.advance(OperationState::Booking);
        let (new_balance, deposit_seq) = match self.credit_checked(owner, settlement, value) {
            Ok(booked) => booked,
            Err(e) => {
                self.return_to_owner(settlement, owner, swap.realized_out).await;
                return Err(e);
            }
        };

        trace.advance(OperationState::Emitting);
        tracing::info!(
            owner,
            input = %asset,
            amount,
            expected = quote.expected_out,
            realized = swap.realized_out,
            value,
            "conversion deposit credited"
        );
        Ok(ConversionReceipt {
            operation_id: trace.id(),
            owner: owner.to_string(),
            input_asset: asset,
            amount_in: amount,
            expected_out: quote.expected_out,
            realized_out: swap.realized_out,
            settlement_asset: settlement,
            value,
            new_balance,
            deposit_seq,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    /// Withdraws canonical value as native currency at a fresh oracle
    /// price.
    pub async fn withdraw_native(
        &self,
        owner: &str,
        value: u128,
    ) -> Result<WithdrawalReceipt, BankError> {
        let mut trace = OperationTrace::begin(OperationKind::NativeWithdrawal);
        let result = self.withdraw_native_inner(owner, value, &mut trace).await;
        Self::seal(&mut trace, &result);
        result
    }

    async fn withdraw_native_inner(
        &self,
        owner: &str,
        value: u128,
        trace: &mut OperationTrace,
    ) -> Result<WithdrawalReceipt, BankError> {
        if value == 0 {
            return Err(BankError::ZeroAmount);
        }
        let _permit = self.entry.enter().ok_or(BankError::OperationInFlight)?;

        self.guard.check_withdrawal(value)?;

        let quote = self.oracle.latest_price().await?;
        let amount_out = normalize::canonical_to_native(value, quote.price, quote.decimals)?;
        if amount_out == 0 {
            return Err(BankError::DustAmount { amount: value });
        }

        trace.advance(OperationState::Booking);
        let (new_balance, withdrawal_seq) = {
            let mut ledger = self.ledger.write();
            let new_balance = ledger.debit(owner, AssetId::Native, value)?;
            (new_balance, ledger.counters().withdrawals)
        };

        if let Err(e) = self
            .transfers
            .push(AssetId::Native, owner, amount_out)
            .await
        {
            // Payout failed; the debit never happened.
            self.ledger.write().revert_debit(owner, AssetId::Native, value);
            return Err(e.into());
        }

        trace.advance(OperationState::Emitting);
        tracing::info!(owner, value, amount_out, "native withdrawal paid");
        Ok(WithdrawalReceipt {
            operation_id: trace.id(),
            owner: owner.to_string(),
            asset: AssetId::Native,
            value,
            amount_out,
            new_balance,
            withdrawal_seq,
            timestamp: Utc::now(),
        })
    }

    /// Withdraws canonical value as a registered asset.
    pub async fn withdraw_asset(
        &self,
        owner: &str,
        asset: AssetId,
        value: u128,
    ) -> Result<WithdrawalReceipt, BankError> {
        let mut trace = OperationTrace::begin(OperationKind::AssetWithdrawal);
        let result = self
            .withdraw_asset_inner(owner, asset, value, &mut trace)
            .await;
        Self::seal(&mut trace, &result);
        result
    }

    async fn withdraw_asset_inner(
        &self,
        owner: &str,
        asset: AssetId,
        value: u128,
        trace: &mut OperationTrace,
    ) -> Result<WithdrawalReceipt, BankError> {
        if value == 0 {
            return Err(BankError::ZeroAmount);
        }
        if asset.is_native() {
            return Err(BankError::NativeViaTokenPath);
        }
        if !self.registry.is_supported(asset) {
            return Err(BankError::UnsupportedAsset(asset));
        }
        let _permit = self.entry.enter().ok_or(BankError::OperationInFlight)?;

        self.guard.check_withdrawal(value)?;

        let decimals = self.registry.decimals_of(asset).await?;
        let amount_out = normalize::normalize(value, CANONICAL_DECIMALS, decimals)?;
        if amount_out == 0 {
            return Err(BankError::DustAmount { amount: value });
        }

        trace.advance(OperationState::Booking);
        let (new_balance, withdrawal_seq) = {
            let mut ledger = self.ledger.write();
            let new_balance = ledger.debit(owner, asset, value)?;
            (new_balance, ledger.counters().withdrawals)
        };

        if let Err(e) = self.transfers.push(asset, owner, amount_out).await {
            self.ledger.write().revert_debit(owner, asset, value);
            return Err(e.into());
        }

        trace.advance(OperationState::Emitting);
        tracing::info!(owner, %asset, value, amount_out, "asset withdrawal paid");
        Ok(WithdrawalReceipt {
            operation_id: trace.id(),
            owner: owner.to_string(),
            asset,
            value,
            amount_out,
            new_balance,
            withdrawal_seq,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    /// Credits under the write lock and returns (new_balance, seq).
    /// Capacity has been checked by the caller; this only surfaces the
    /// (practically unreachable) overflow case.
    fn credit_checked(
        &self,
        owner: &str,
        asset: AssetId,
        value: u128,
    ) -> Result<(u128, u64), BankError> {
        let mut ledger = self.ledger.write();
        let new_balance = ledger.credit(owner, asset, value)?;
        Ok((new_balance, ledger.counters().deposits))
    }

    /// Best-effort return of pulled-in (or converted) value during an
    /// abort. A failed return is logged and the original error still
    /// propagates -- the ledger was never touched, and the funds stay in
    /// custody where the transfer agent can retry.
    async fn return_to_owner(&self, asset: AssetId, owner: &str, amount: u128) {
        if let Err(e) = self.transfers.push(asset, owner, amount).await {
            tracing::error!(
                owner,
                %asset,
                amount,
                error = %e,
                "abort refund failed; funds remain in custody"
            );
        }
    }

    /// Stamps the trace terminal from the operation outcome.
    fn seal<T>(trace: &mut OperationTrace, result: &Result<T, BankError>) {
        match result {
            Ok(_) => {
                trace.finish();
            }
            Err(e) => {
                tracing::warn!(
                    operation = %trace.id(),
                    kind = %trace.kind(),
                    error = %e,
                    "operation aborted"
                );
                trace.abort();
            }
        }
    }
}

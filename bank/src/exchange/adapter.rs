//! # Exchange Adapter
//!
//! Wraps the single [`SwapVenue`] behind the bank's own safety rails:
//!
//! - A **route table** mapping input assets to configured conversion
//!   paths. No route means "unquotable" -- the quote comes back zero,
//!   which is a signal, not a failure.
//! - **Pre-trade slippage validation** against the advisory quote, in
//!   basis points, before any value moves. Catching a doomed conversion
//!   here costs a read; catching it at the venue costs the whole swap.
//! - **Independent floor enforcement** on the realized output. The venue
//!   promises to revert below `amount_out_min`, but venues with
//!   unreliable revert semantics exist, so the adapter re-checks.
//!
//! The advisory quote and the realized result are different types on
//! purpose. Only a [`SwapResult`] -- produced after the venue call
//! returned -- is allowed anywhere near the ledger.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::venue::{validate_path, SwapPath, SwapVenue};
use crate::asset::AssetId;
use crate::config::{BPS_DENOMINATOR, MAX_SLIPPAGE_BPS};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from quoting and conversion.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// No conversion path is configured for the asset.
    #[error("no conversion route configured for {0}")]
    NoConversionRoute(AssetId),

    /// A route being configured has the wrong shape.
    #[error("malformed conversion path: {reason}")]
    MalformedPath {
        /// What exactly is wrong with the path.
        reason: String,
    },

    /// The caller's floor is unachievable or too far below the quote.
    #[error("slippage too high: expected {expected}, minimum {minimum}")]
    SlippageTooHigh {
        /// The advisory quoted output.
        expected: u128,
        /// The caller's minimum acceptable output.
        minimum: u128,
    },

    /// The venue call itself failed.
    #[error("swap failed: {0}")]
    SwapFailed(String),

    /// The venue returned less than the floor without erroring.
    #[error("insufficient output amount: realized {realized}, minimum {minimum}")]
    InsufficientOutputAmount {
        /// What the venue actually delivered.
        realized: u128,
        /// The floor it was given.
        minimum: u128,
    },

    /// The conversion was invoked past its expiry instant.
    #[error("conversion deadline expired: deadline {deadline}, now {now}")]
    DeadlineExpired {
        /// The caller-supplied expiry (unix seconds).
        deadline: u64,
        /// The clock reading at invocation.
        now: u64,
    },
}

// ---------------------------------------------------------------------------
// Quote & Result
// ---------------------------------------------------------------------------

/// An advisory output estimate from the venue's read-only simulation.
/// Never credited, never trusted past the operation that fetched it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// The asset being converted.
    pub input_asset: AssetId,
    /// The input amount, in the input asset's native units.
    pub amount_in: u128,
    /// The simulated output in settlement-asset units. Zero when no
    /// route is configured.
    pub expected_out: u128,
}

/// The authoritative outcome of an executed conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    /// The asset that was converted.
    pub input_asset: AssetId,
    /// The input amount that was spent.
    pub amount_in: u128,
    /// What the venue actually delivered, in settlement-asset units.
    pub realized_out: u128,
}

// ---------------------------------------------------------------------------
// ExchangeAdapter
// ---------------------------------------------------------------------------

/// The bank's only doorway to the conversion venue.
pub struct ExchangeAdapter {
    venue: Arc<dyn SwapVenue>,
    settlement: AssetId,
    routes: RwLock<HashMap<AssetId, SwapPath>>,
}

impl ExchangeAdapter {
    /// Creates an adapter over the venue, settling into `settlement`.
    pub fn new(venue: Arc<dyn SwapVenue>, settlement: AssetId) -> Self {
        Self {
            venue,
            settlement,
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// The asset every conversion settles into.
    pub fn settlement_asset(&self) -> AssetId {
        self.settlement
    }

    /// Configures (or replaces) the conversion route for an input asset.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::MalformedPath`] when the path does not start at
    /// `input`, does not end at the settlement asset, or has a bad shape.
    pub fn set_route(&self, input: AssetId, path: SwapPath) -> Result<(), ExchangeError> {
        validate_path(&path, input, self.settlement)
            .map_err(|reason| ExchangeError::MalformedPath { reason })?;
        self.routes.write().insert(input, path);
        tracing::info!(asset = %input, "conversion route configured");
        Ok(())
    }

    /// Removes the conversion route for an input asset, making it
    /// unquotable again.
    pub fn clear_route(&self, input: AssetId) {
        self.routes.write().remove(&input);
        tracing::info!(asset = %input, "conversion route cleared");
    }

    /// Returns `true` when a route is configured for the asset.
    pub fn has_route(&self, input: AssetId) -> bool {
        self.routes.read().contains_key(&input)
    }

    /// Simulates a conversion. A missing route yields `expected_out: 0`
    /// rather than an error -- "unquotable" is an answer, not a failure.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::SwapFailed`] when the venue's simulation call
    /// itself fails.
    pub async fn quote(
        &self,
        input: AssetId,
        amount_in: u128,
    ) -> Result<SwapQuote, ExchangeError> {
        let path = match self.route_for(input) {
            Some(path) => path,
            None => {
                return Ok(SwapQuote {
                    input_asset: input,
                    amount_in,
                    expected_out: 0,
                })
            }
        };

        let amounts = self
            .venue
            .get_amounts_out(amount_in, &path)
            .await
            .map_err(|e| ExchangeError::SwapFailed(e.to_string()))?;
        let expected_out = amounts.last().copied().unwrap_or(0);

        Ok(SwapQuote {
            input_asset: input,
            amount_in,
            expected_out,
        })
    }

    /// Validates the caller's floor against an advisory quote, before any
    /// value moves.
    ///
    /// Two ways to fail, both [`ExchangeError::SlippageTooHigh`]: the
    /// floor exceeds the quote (the caller wants more than is achievable),
    /// or the shortfall `(expected - minimum) / expected` exceeds
    /// [`MAX_SLIPPAGE_BPS`]. Independent of the venue's own floor.
    pub fn validate_slippage(&self, expected: u128, minimum: u128) -> Result<(), ExchangeError> {
        if minimum > expected {
            return Err(ExchangeError::SlippageTooHigh { expected, minimum });
        }
        if expected == 0 {
            // Unquotable inputs are rejected upstream; a zero quote with
            // a zero floor has nothing to validate.
            return Ok(());
        }
        let shortfall = expected - minimum;
        if shortfall * BPS_DENOMINATOR > expected * MAX_SLIPPAGE_BPS {
            return Err(ExchangeError::SlippageTooHigh { expected, minimum });
        }
        Ok(())
    }

    /// Executes a conversion with `minimum_out` as the venue-side floor
    /// and re-checks the realized output independently.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::DeadlineExpired`] before the venue is called,
    /// [`ExchangeError::NoConversionRoute`] for routeless assets,
    /// [`ExchangeError::SwapFailed`] when the venue errors, and
    /// [`ExchangeError::InsufficientOutputAmount`] when the venue
    /// delivers below the floor without erroring.
    pub async fn convert(
        &self,
        input: AssetId,
        amount_in: u128,
        minimum_out: u128,
        recipient: &str,
        deadline: u64,
    ) -> Result<SwapResult, ExchangeError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        if now > deadline {
            return Err(ExchangeError::DeadlineExpired { deadline, now });
        }

        let path = self
            .route_for(input)
            .ok_or(ExchangeError::NoConversionRoute(input))?;

        let amounts = self
            .venue
            .swap_exact_tokens_for_tokens(amount_in, minimum_out, &path, recipient, deadline)
            .await
            .map_err(|e| ExchangeError::SwapFailed(e.to_string()))?;
        let realized_out = amounts.last().copied().unwrap_or(0);

        if realized_out < minimum_out {
            // The venue should have reverted. It didn't. Trust the check,
            // not the venue.
            return Err(ExchangeError::InsufficientOutputAmount {
                realized: realized_out,
                minimum: minimum_out,
            });
        }

        tracing::debug!(
            asset = %input,
            amount_in,
            realized_out,
            "conversion executed"
        );

        Ok(SwapResult {
            input_asset: input,
            amount_in,
            realized_out,
        })
    }

    fn route_for(&self, input: AssetId) -> Option<SwapPath> {
        self.routes.read().get(&input).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::venue::VenueError;
    use async_trait::async_trait;

    fn token(byte: u8) -> AssetId {
        AssetId::token([byte; 20])
    }

    fn settlement() -> AssetId {
        token(0xEE)
    }

    /// Venue applying a fixed rate, optionally failing, optionally
    /// delivering below the requested floor without erroring.
    struct FixedRateVenue {
        out_per_in_milli: u128,
        fail_swaps: bool,
        ignore_floor: bool,
    }

    impl FixedRateVenue {
        fn rate(out_per_in_milli: u128) -> Self {
            Self {
                out_per_in_milli,
                fail_swaps: false,
                ignore_floor: false,
            }
        }

        fn output_for(&self, amount_in: u128) -> u128 {
            amount_in * self.out_per_in_milli / 1_000
        }
    }

    #[async_trait]
    impl SwapVenue for FixedRateVenue {
        async fn get_amounts_out(
            &self,
            amount_in: u128,
            path: &[AssetId],
        ) -> Result<Vec<u128>, VenueError> {
            let mut amounts = vec![amount_in];
            for _ in 1..path.len() {
                amounts.push(self.output_for(amount_in));
            }
            Ok(amounts)
        }

        async fn swap_exact_tokens_for_tokens(
            &self,
            amount_in: u128,
            amount_out_min: u128,
            _path: &[AssetId],
            _recipient: &str,
            _deadline: u64,
        ) -> Result<Vec<u128>, VenueError> {
            if self.fail_swaps {
                return Err(VenueError::CallFailed("venue reverted".into()));
            }
            let out = self.output_for(amount_in);
            if out < amount_out_min && !self.ignore_floor {
                return Err(VenueError::CallFailed("below floor".into()));
            }
            Ok(vec![amount_in, out])
        }
    }

    fn adapter_with(venue: FixedRateVenue) -> ExchangeAdapter {
        let adapter = ExchangeAdapter::new(Arc::new(venue), settlement());
        adapter
            .set_route(token(0x01), vec![token(0x01), settlement()])
            .unwrap();
        adapter
    }

    fn far_future() -> u64 {
        chrono::Utc::now().timestamp() as u64 + 600
    }

    #[tokio::test]
    async fn quote_without_route_is_zero_not_error() {
        let adapter = adapter_with(FixedRateVenue::rate(1_000));
        let quote = adapter.quote(token(0x42), 1_000).await.unwrap();
        assert_eq!(quote.expected_out, 0);
    }

    #[tokio::test]
    async fn quote_with_route_returns_last_amount() {
        let adapter = adapter_with(FixedRateVenue::rate(2_000));
        let quote = adapter.quote(token(0x01), 500).await.unwrap();
        assert_eq!(quote.expected_out, 1_000);
    }

    #[test]
    fn slippage_at_five_percent_passes() {
        let adapter = adapter_with(FixedRateVenue::rate(1_000));
        // expected 1000, minimum 950: exactly 5%, allowed.
        assert!(adapter.validate_slippage(1_000, 950).is_ok());
    }

    #[test]
    fn slippage_beyond_five_percent_rejected() {
        let adapter = adapter_with(FixedRateVenue::rate(1_000));
        let result = adapter.validate_slippage(1_000, 899);
        assert!(matches!(
            result,
            Err(ExchangeError::SlippageTooHigh {
                expected: 1_000,
                minimum: 899,
            })
        ));
    }

    #[test]
    fn minimum_above_expected_rejected() {
        let adapter = adapter_with(FixedRateVenue::rate(1_000));
        assert!(matches!(
            adapter.validate_slippage(1_000, 1_001),
            Err(ExchangeError::SlippageTooHigh { .. })
        ));
    }

    #[tokio::test]
    async fn convert_returns_realized_output() {
        let adapter = adapter_with(FixedRateVenue::rate(1_500));
        let result = adapter
            .convert(token(0x01), 1_000, 1_400, "0xbank", far_future())
            .await
            .unwrap();
        assert_eq!(result.realized_out, 1_500);
        assert_eq!(result.amount_in, 1_000);
    }

    #[tokio::test]
    async fn convert_without_route_rejected() {
        let adapter = adapter_with(FixedRateVenue::rate(1_000));
        let result = adapter
            .convert(token(0x42), 1_000, 900, "0xbank", far_future())
            .await;
        assert!(matches!(result, Err(ExchangeError::NoConversionRoute(_))));
    }

    #[tokio::test]
    async fn venue_failure_is_swap_failed() {
        let venue = FixedRateVenue {
            fail_swaps: true,
            ..FixedRateVenue::rate(1_000)
        };
        let adapter = adapter_with(venue);
        let result = adapter
            .convert(token(0x01), 1_000, 900, "0xbank", far_future())
            .await;
        assert!(matches!(result, Err(ExchangeError::SwapFailed(_))));
    }

    #[tokio::test]
    async fn under_floor_delivery_caught_independently() {
        // Venue "succeeds" while delivering below the floor; the adapter
        // must catch it even though the venue didn't revert.
        let venue = FixedRateVenue {
            ignore_floor: true,
            ..FixedRateVenue::rate(500)
        };
        let adapter = adapter_with(venue);
        let result = adapter
            .convert(token(0x01), 1_000, 900, "0xbank", far_future())
            .await;
        assert!(matches!(
            result,
            Err(ExchangeError::InsufficientOutputAmount {
                realized: 500,
                minimum: 900,
            })
        ));
    }

    #[tokio::test]
    async fn expired_deadline_rejected_before_venue_call() {
        let venue = FixedRateVenue {
            fail_swaps: true, // would fail loudly if reached
            ..FixedRateVenue::rate(1_000)
        };
        let adapter = adapter_with(venue);
        let result = adapter.convert(token(0x01), 1_000, 900, "0xbank", 1).await;
        assert!(matches!(result, Err(ExchangeError::DeadlineExpired { .. })));
    }

    #[test]
    fn malformed_route_rejected() {
        let adapter = ExchangeAdapter::new(Arc::new(FixedRateVenue::rate(1_000)), settlement());
        // Ends at the wrong asset.
        let result = adapter.set_route(token(0x01), vec![token(0x01), token(0x02)]);
        assert!(matches!(result, Err(ExchangeError::MalformedPath { .. })));
        assert!(!adapter.has_route(token(0x01)));
    }

    #[test]
    fn clear_route_makes_asset_unquotable() {
        let adapter = adapter_with(FixedRateVenue::rate(1_000));
        assert!(adapter.has_route(token(0x01)));
        adapter.clear_route(token(0x01));
        assert!(!adapter.has_route(token(0x01)));
    }
}

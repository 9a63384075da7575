//! # Price Oracle Gateway
//!
//! Wraps a single [`PriceFeed`] and refuses to hand out a price that fails
//! any of three independent trust checks:
//!
//! 1. **Positivity** -- a zero or negative answer means the feed is broken
//!    or manipulated. [`OracleError::OracleCompromised`].
//! 2. **Heartbeat** -- an answer older than the heartbeat window is stale.
//!    [`OracleError::StalePrice`].
//! 3. **Round advancement** -- an answer produced by an older round than
//!    the latest known round means the feed has stopped advancing while
//!    still stamping fresh timestamps. [`OracleError::StaleRound`].
//!
//! All three run on every read. Nothing is cached across operations --
//! the price can move between any two calls, and a cached quote is a
//! manipulated quote waiting to happen.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::feed::{FeedError, PriceFeed, RoundData};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from price validation.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The feed reported a non-positive price.
    #[error("oracle compromised: non-positive answer {answer}")]
    OracleCompromised {
        /// The offending answer, verbatim.
        answer: i128,
    },

    /// The answer is older than the heartbeat window.
    #[error("stale price: answer is {age_secs}s old (heartbeat {heartbeat_secs}s)")]
    StalePrice {
        /// Seconds since the answer was updated.
        age_secs: u64,
        /// The configured heartbeat threshold in seconds.
        heartbeat_secs: u64,
    },

    /// The answer was produced by a round older than the latest known
    /// round -- the feed has stopped advancing.
    #[error("stale price: answered in round {answered_in_round}, latest round is {round_id}")]
    StaleRound {
        /// The latest known round.
        round_id: u64,
        /// The round that produced the answer.
        answered_in_round: u64,
    },

    /// The feed call itself failed.
    #[error("price feed unavailable: {0}")]
    FeedUnavailable(String),
}

impl From<FeedError> for OracleError {
    fn from(e: FeedError) -> Self {
        OracleError::FeedUnavailable(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// PriceQuote
// ---------------------------------------------------------------------------

/// A validated price, safe to feed into normalization arithmetic.
///
/// Ephemeral by design: fetched fresh on every operation that needs one,
/// never stored, never reused across operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// The price, strictly positive, in `decimals` fractional digits.
    pub price: u128,
    /// Fixed-point precision of `price`.
    pub decimals: u8,
    /// Unix timestamp (seconds) the answer was updated.
    pub updated_at: u64,
    /// Round that reported the answer.
    pub round_id: u64,
    /// Round that produced the answer.
    pub answered_in_round: u64,
}

// ---------------------------------------------------------------------------
// PriceOracleGateway
// ---------------------------------------------------------------------------

/// Validated read access to the configured price feed.
///
/// The feed source is swappable at runtime (an admin operation) without
/// touching the heartbeat or the checks -- trust policy belongs to the
/// gateway, not to whichever feed happens to be plugged in.
pub struct PriceOracleGateway {
    feed: RwLock<Arc<dyn PriceFeed>>,
    heartbeat: Duration,
}

impl PriceOracleGateway {
    /// Creates a gateway over the given feed with the given heartbeat.
    pub fn new(feed: Arc<dyn PriceFeed>, heartbeat: Duration) -> Self {
        Self {
            feed: RwLock::new(feed),
            heartbeat,
        }
    }

    /// Replaces the feed source. Takes effect on the next read.
    pub fn set_source(&self, feed: Arc<dyn PriceFeed>) {
        *self.feed.write() = feed;
        tracing::info!("oracle feed source replaced");
    }

    /// Fetches and validates the latest price.
    ///
    /// # Errors
    ///
    /// Any of the three trust-check failures, or
    /// [`OracleError::FeedUnavailable`] when the feed call itself fails.
    pub async fn latest_price(&self) -> Result<PriceQuote, OracleError> {
        let feed = Arc::clone(&*self.feed.read());
        let data = feed.latest_round_data().await?;
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.validate(data, feed.decimals(), now)
    }

    /// Runs the three trust checks against an explicit `now`. Split out
    /// so tests can pin the clock.
    fn validate(&self, data: RoundData, decimals: u8, now: u64) -> Result<PriceQuote, OracleError> {
        if data.answer <= 0 {
            return Err(OracleError::OracleCompromised {
                answer: data.answer,
            });
        }

        let age_secs = now.saturating_sub(data.updated_at);
        if age_secs > self.heartbeat.as_secs() {
            return Err(OracleError::StalePrice {
                age_secs,
                heartbeat_secs: self.heartbeat.as_secs(),
            });
        }

        if data.answered_in_round < data.round_id {
            return Err(OracleError::StaleRound {
                round_id: data.round_id,
                answered_in_round: data.answered_in_round,
            });
        }

        Ok(PriceQuote {
            price: data.answer as u128,
            decimals,
            updated_at: data.updated_at,
            round_id: data.round_id,
            answered_in_round: data.answered_in_round,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Feed that returns whatever round it was given.
    struct CannedFeed {
        data: RoundData,
    }

    #[async_trait]
    impl PriceFeed for CannedFeed {
        async fn latest_round_data(&self) -> Result<RoundData, FeedError> {
            Ok(self.data)
        }

        fn decimals(&self) -> u8 {
            8
        }
    }

    const NOW: u64 = 1_700_000_000;
    const HEARTBEAT: Duration = Duration::from_secs(3600);

    fn gateway(data: RoundData) -> PriceOracleGateway {
        PriceOracleGateway::new(Arc::new(CannedFeed { data }), HEARTBEAT)
    }

    fn healthy_round() -> RoundData {
        RoundData {
            round_id: 100,
            answer: 200_000_000_000, // 2000.00000000
            updated_at: NOW - 60,
            answered_in_round: 100,
        }
    }

    #[test]
    fn healthy_round_passes() {
        let data = healthy_round();
        let quote = gateway(data).validate(data, 8, NOW).unwrap();
        assert_eq!(quote.price, 200_000_000_000);
        assert_eq!(quote.decimals, 8);
        assert_eq!(quote.round_id, 100);
    }

    #[test]
    fn zero_answer_is_compromised() {
        let data = RoundData {
            answer: 0,
            ..healthy_round()
        };
        let result = gateway(data).validate(data, 8, NOW);
        assert!(matches!(
            result,
            Err(OracleError::OracleCompromised { answer: 0 })
        ));
    }

    #[test]
    fn negative_answer_is_compromised() {
        let data = RoundData {
            answer: -1,
            ..healthy_round()
        };
        let result = gateway(data).validate(data, 8, NOW);
        assert!(matches!(result, Err(OracleError::OracleCompromised { .. })));
    }

    #[test]
    fn answer_older_than_heartbeat_is_stale() {
        let data = RoundData {
            updated_at: NOW - HEARTBEAT.as_secs() - 1,
            ..healthy_round()
        };
        let result = gateway(data).validate(data, 8, NOW);
        assert!(matches!(result, Err(OracleError::StalePrice { .. })));
    }

    #[test]
    fn answer_exactly_at_heartbeat_still_fresh() {
        // The window is inclusive: age == heartbeat passes, age > fails.
        let data = RoundData {
            updated_at: NOW - HEARTBEAT.as_secs(),
            ..healthy_round()
        };
        assert!(gateway(data).validate(data, 8, NOW).is_ok());
    }

    #[test]
    fn lagging_round_is_stale() {
        // Fresh timestamp, but the answer came from an older round --
        // the feed is coasting.
        let data = RoundData {
            round_id: 101,
            answered_in_round: 99,
            ..healthy_round()
        };
        let result = gateway(data).validate(data, 8, NOW);
        assert!(matches!(
            result,
            Err(OracleError::StaleRound {
                round_id: 101,
                answered_in_round: 99,
            })
        ));
    }

    #[test]
    fn future_timestamp_tolerated() {
        // Slight clock skew between us and the feed must not brick reads.
        let data = RoundData {
            updated_at: NOW + 30,
            ..healthy_round()
        };
        assert!(gateway(data).validate(data, 8, NOW).is_ok());
    }

    #[tokio::test]
    async fn set_source_takes_effect_on_next_read() {
        let stale = RoundData {
            updated_at: 0,
            ..healthy_round()
        };
        let gw = gateway(stale);

        // latest_price uses the wall clock, so give the replacement feed
        // a wall-clock-fresh answer.
        let fresh = RoundData {
            updated_at: chrono::Utc::now().timestamp() as u64,
            ..healthy_round()
        };
        gw.set_source(Arc::new(CannedFeed { data: fresh }));
        let quote = gw.latest_price().await.unwrap();
        assert_eq!(quote.price, 200_000_000_000);
    }

    #[tokio::test]
    async fn feed_failure_surfaces_as_unavailable() {
        struct BrokenFeed;

        #[async_trait]
        impl PriceFeed for BrokenFeed {
            async fn latest_round_data(&self) -> Result<RoundData, FeedError> {
                Err(FeedError::CallFailed("connection refused".into()))
            }

            fn decimals(&self) -> u8 {
                8
            }
        }

        let gw = PriceOracleGateway::new(Arc::new(BrokenFeed), HEARTBEAT);
        let result = gw.latest_price().await;
        assert!(matches!(result, Err(OracleError::FeedUnavailable(_))));
    }
}

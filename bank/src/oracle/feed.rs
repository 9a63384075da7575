//! # Price Feed Interface
//!
//! The raw shape of an external price feed round. The feed reports the
//! native asset's USD price as a signed fixed-point value together with
//! enough round bookkeeping for the gateway to detect a feed that has
//! stopped advancing while still returning fresh-looking timestamps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One round of feed data, as reported by the source.
///
/// `answer` is signed because the feed interface allows it -- the gateway
/// is where non-positive answers go to die, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Monotonically increasing round identifier.
    pub round_id: u64,
    /// The reported price in `decimals` fractional digits. Signed.
    pub answer: i128,
    /// Unix timestamp (seconds) when the answer was last updated.
    pub updated_at: u64,
    /// The round that actually produced this answer. Lags behind
    /// `round_id` when the feed is serving a carried-forward value.
    pub answered_in_round: u64,
}

/// Errors a feed source can report.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The call to the feed surface failed.
    #[error("price feed call failed: {0}")]
    CallFailed(String),
}

/// A single external price feed for the native asset against USD.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Returns the latest round of feed data.
    async fn latest_round_data(&self) -> Result<RoundData, FeedError>;

    /// The fixed-point precision of `answer`.
    fn decimals(&self) -> u8;
}

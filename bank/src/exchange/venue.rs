//! # Swap Venue Interface
//!
//! The raw shape of the single external conversion venue the bank trades
//! against: a read-only amounts-out simulation and a state-mutating
//! exact-input swap with the venue's own output floor and a deadline.
//!
//! A `path` is an ordered sequence of asset identifiers. The first element
//! is the input asset, the last is the asset the conversion settles into,
//! and anything between is a routing hop the venue needs.

use async_trait::async_trait;
use thiserror::Error;

use crate::asset::AssetId;
use crate::config::MAX_SWAP_PATH_LEN;

/// An ordered conversion route from an input asset to a settlement asset.
pub type SwapPath = Vec<AssetId>;

/// Errors a venue can report.
#[derive(Debug, Error)]
pub enum VenueError {
    /// The venue call failed (reverted, timed out, returned garbage).
    #[error("venue call failed: {0}")]
    CallFailed(String),
}

/// A single external conversion venue.
///
/// Both methods return the full amounts vector (one entry per path
/// element); callers take the last element as the output. The simulation
/// is advisory; only the executed swap's result is ever trusted.
#[async_trait]
pub trait SwapVenue: Send + Sync {
    /// Simulates the output amounts for swapping `amount_in` along `path`.
    /// Read-only; does not move value.
    async fn get_amounts_out(
        &self,
        amount_in: u128,
        path: &[AssetId],
    ) -> Result<Vec<u128>, VenueError>;

    /// Executes an exact-input swap along `path`, sending the output to
    /// `recipient`, enforcing the venue-side floor `amount_out_min`, and
    /// failing once `deadline` (unix seconds) has passed.
    async fn swap_exact_tokens_for_tokens(
        &self,
        amount_in: u128,
        amount_out_min: u128,
        path: &[AssetId],
        recipient: &str,
        deadline: u64,
    ) -> Result<Vec<u128>, VenueError>;
}

/// Validates the structural shape of a conversion path.
///
/// Returns a human-readable reason when the path is malformed: too short,
/// too long, wrong endpoints, or a repeated adjacent hop.
pub fn validate_path(path: &[AssetId], input: AssetId, settlement: AssetId) -> Result<(), String> {
    if path.len() < 2 {
        return Err(format!("path too short: {} elements", path.len()));
    }
    if path.len() > MAX_SWAP_PATH_LEN {
        return Err(format!(
            "path too long: {} elements (max {MAX_SWAP_PATH_LEN})",
            path.len()
        ));
    }
    if path[0] != input {
        return Err(format!("path starts at {}, expected {input}", path[0]));
    }
    let last = path[path.len() - 1];
    if last != settlement {
        return Err(format!(
            "path ends at {last}, expected settlement asset {settlement}"
        ));
    }
    if path.windows(2).any(|w| w[0] == w[1]) {
        return Err("path repeats an adjacent hop".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8) -> AssetId {
        AssetId::token([byte; 20])
    }

    #[test]
    fn direct_path_is_valid() {
        let input = token(0x01);
        let settlement = token(0x02);
        assert!(validate_path(&[input, settlement], input, settlement).is_ok());
    }

    #[test]
    fn multi_hop_path_is_valid() {
        let input = token(0x01);
        let hop = token(0x03);
        let settlement = token(0x02);
        assert!(validate_path(&[input, hop, settlement], input, settlement).is_ok());
    }

    #[test]
    fn single_element_path_rejected() {
        let input = token(0x01);
        assert!(validate_path(&[input], input, input).is_err());
    }

    #[test]
    fn wrong_endpoints_rejected() {
        let input = token(0x01);
        let settlement = token(0x02);
        let other = token(0x03);

        assert!(validate_path(&[other, settlement], input, settlement).is_err());
        assert!(validate_path(&[input, other], input, settlement).is_err());
    }

    #[test]
    fn overlong_path_rejected() {
        let input = token(0x01);
        let settlement = token(0x02);
        let path = vec![input, token(0x03), token(0x04), token(0x05), settlement];
        assert!(validate_path(&path, input, settlement).is_err());
    }

    #[test]
    fn repeated_adjacent_hop_rejected() {
        let input = token(0x01);
        let settlement = token(0x02);
        let path = vec![input, input, settlement];
        assert!(validate_path(&path, input, settlement).is_err());
    }
}

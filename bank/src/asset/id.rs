//! # Asset Identifiers
//!
//! Every asset the bank can hold is addressed by an [`AssetId`]: either the
//! chain-native currency sentinel or a 20-byte token address. The id is
//! `Copy`, hashable, and serializes as a string (`"native"` or `0x`-hex) so
//! it can key JSON maps and REST paths without ceremony.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a token address in bytes.
pub const TOKEN_ADDRESS_LEN: usize = 20;

/// String form of the native-currency sentinel.
const NATIVE_TAG: &str = "native";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from parsing an asset id string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetIdParseError {
    /// The string is neither `"native"` nor a `0x`-prefixed address.
    #[error("unrecognized asset id format: {0:?}")]
    UnrecognizedFormat(String),

    /// The hex payload does not decode or has the wrong length.
    #[error("invalid token address: {0}")]
    InvalidAddress(String),
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Identifies an asset the ledger can account for.
///
/// The native currency is a sentinel rather than a reserved address --
/// there is no address the native asset could collide with, and matching
/// on the variant keeps the price-vs-scaling split in the pipelines
/// explicit instead of hidden behind a magic constant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetId {
    /// The chain-native currency. Always supported, never removable.
    Native,
    /// An external token, addressed by its 20-byte identifier.
    Token([u8; TOKEN_ADDRESS_LEN]),
}

impl AssetId {
    /// Returns `true` for the native-currency sentinel.
    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }

    /// Builds a token id from raw address bytes.
    pub fn token(bytes: [u8; TOKEN_ADDRESS_LEN]) -> Self {
        AssetId::Token(bytes)
    }

    /// Parses a `0x`-prefixed 40-hex-digit token address.
    pub fn token_from_hex(s: &str) -> Result<Self, AssetIdParseError> {
        let stripped = s
            .strip_prefix("0x")
            .ok_or_else(|| AssetIdParseError::InvalidAddress(format!("missing 0x prefix: {s}")))?;
        let bytes = hex::decode(stripped)
            .map_err(|e| AssetIdParseError::InvalidAddress(e.to_string()))?;
        if bytes.len() != TOKEN_ADDRESS_LEN {
            return Err(AssetIdParseError::InvalidAddress(format!(
                "expected {TOKEN_ADDRESS_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; TOKEN_ADDRESS_LEN];
        arr.copy_from_slice(&bytes);
        Ok(AssetId::Token(arr))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "{NATIVE_TAG}"),
            AssetId::Token(bytes) => write!(f, "0x{}", hex::encode(bytes)),
        }
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "AssetId(native)"),
            AssetId::Token(bytes) => write!(f, "AssetId(0x{}...)", &hex::encode(bytes)[..8]),
        }
    }
}

impl FromStr for AssetId {
    type Err = AssetIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(NATIVE_TAG) {
            return Ok(AssetId::Native);
        }
        if s.starts_with("0x") {
            return Self::token_from_hex(s);
        }
        Err(AssetIdParseError::UnrecognizedFormat(s.to_string()))
    }
}

// String serde keeps the id usable as a JSON object key.
impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

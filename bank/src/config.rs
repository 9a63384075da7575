//! # Engine Configuration & Constants
//!
//! Every magic number in AURUM lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are baked into the accounting semantics -- changing
//! the canonical precision after balances exist is not a config tweak, it's
//! a migration. Choose wisely.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Fixed-Point Precision
// ---------------------------------------------------------------------------

/// Canonical accounting precision -- the single fixed-point scale every
/// balance, limit, and total is expressed in. Six fractional digits, the
/// same scale USDC settled on. One canonical unit is 10^-6 dollars.
pub const CANONICAL_DECIMALS: u8 = 6;

/// Native currency precision. The chain-native asset carries 18 fractional
/// digits; deposits arrive in these smallest units and are normalized down.
pub const NATIVE_DECIMALS: u8 = 18;

/// Price feed precision. The oracle reports USD prices with 8 fractional
/// digits. A price of `2000.00000000` arrives as `200_000_000_000`.
pub const ORACLE_DECIMALS: u8 = 8;

/// Largest base-10 exponent the normalizer will scale by. `10^38` still
/// fits in a `u128`; anything above is a caller bug, not a rounding case.
pub const MAX_SCALE_EXPONENT: u32 = 38;

// ---------------------------------------------------------------------------
// Oracle Trust Parameters
// ---------------------------------------------------------------------------

/// Maximum tolerated age of an oracle answer. A quote older than this is
/// stale and every price-dependent operation aborts. One hour matches the
/// feed's own update commitment.
pub const ORACLE_HEARTBEAT: Duration = Duration::from_secs(3600);

/// Heartbeat as whole seconds -- for arithmetic against unix timestamps.
/// Keep in sync with [`ORACLE_HEARTBEAT`] or face the wrath of the tests.
pub const ORACLE_HEARTBEAT_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// Conversion Parameters
// ---------------------------------------------------------------------------

/// Maximum slippage tolerated between an advisory quote and the caller's
/// minimum acceptable output, in basis points. 1 bp = 0.01%, so 500 bps
/// = 5.00%. Integer bps keeps the check free of floating point.
pub const MAX_SLIPPAGE_BPS: u128 = 500;

/// Basis-point denominator. 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Longest conversion path the exchange adapter accepts. Input, at most
/// two intermediate hops, and the settlement asset.
pub const MAX_SWAP_PATH_LEN: usize = 4;

// ---------------------------------------------------------------------------
// Default Limits (devnet)
// ---------------------------------------------------------------------------

/// Default bank-wide capacity ceiling: 100 million dollars in canonical
/// units. Production deployments size this from the risk desk, not from
/// this constant.
pub const DEFAULT_BANK_CAP: u128 = 100_000_000 * 1_000_000;

/// Default per-operation withdrawal ceiling: 50 thousand dollars in
/// canonical units. A flat blast-radius limit per call, deliberately
/// independent of how much the caller holds.
pub const DEFAULT_WITHDRAWAL_CEILING: u128 = 50_000 * 1_000_000;

// ---------------------------------------------------------------------------
// Network Parameters (node defaults)
// ---------------------------------------------------------------------------

/// Default REST API port.
pub const DEFAULT_RPC_PORT: u16 = 9851;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9852;

/// Engine version string, assembled at compile time so we don't allocate
/// for something this trivial at runtime.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

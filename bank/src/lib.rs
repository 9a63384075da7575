// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AURUM — Custodial Multi-Asset Banking Engine
//!
//! AURUM keeps books for money that comes in many shapes. Heterogeneous
//! asset amounts are normalized into a single 6-decimal unit of account,
//! every credit is gated by a bank-wide capacity ceiling, every debit by
//! a per-operation withdrawal limit, and the price feed that values the
//! native currency is treated as hostile until proven fresh.
//!
//! ## Architecture
//!
//! The engine is split into modules that mirror the actual trust
//! boundaries of a custodial bank:
//!
//! - **normalize** — Fixed-point rescaling. The only place division lives.
//! - **asset** — Asset identity, the accepted-asset registry, and the
//!   pull/push transfer capability.
//! - **oracle** — The price feed gateway. Three checks, every read,
//!   no exceptions, no caching.
//! - **ledger** — Balances, totals, counters, and the two risk limits.
//! - **exchange** — The conversion venue adapter: routes, slippage rails,
//!   floor enforcement.
//! - **bank** — The pipelines that compose all of the above into atomic
//!   operations.
//! - **storage** — Snapshot persistence over sled.
//! - **config** — Engine constants and network parameters.
//!
//! ## Design Philosophy
//!
//! 1. Advisory numbers never touch the ledger. Quotes gate, results book.
//! 2. Every failure is specific and aborts the whole operation. Atomicity
//!    is the cleanup logic.
//! 3. Amounts are `u128` in smallest units. Floating point is for
//!    dashboards, not for books.
//! 4. If it touches money, it has tests. Plural.

pub mod asset;
pub mod bank;
pub mod config;
pub mod exchange;
pub mod ledger;
pub mod normalize;
pub mod oracle;
pub mod storage;

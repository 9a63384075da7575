//! # Ledger Module — Balances, Totals & Risk Limits
//!
//! The ledger is where money lives in AURUM. Every canonical balance,
//! every per-asset total, both operation counters -- they all pass
//! through this module, and nothing else is allowed to mutate them.
//!
//! ```text
//! book.rs      — per-owner-per-asset balances, totals, counters
//! capacity.rs  — bank cap and per-operation withdrawal ceiling
//! ```
//!
//! Design rule worth repeating: the book mutates, the guard checks, and
//! the pipelines are responsible for calling the guard before the book.
//! The split keeps the ordering explicit where it can be audited.

pub mod book;
pub mod capacity;

pub use book::{Counters, Ledger, LedgerError};
pub use capacity::{CapacityError, CapacityGuard, Limits};

//! # Exchange Module — Conversion Venue Boundary
//!
//! ```text
//! venue.rs    — the raw SwapVenue interface and path validation
//! adapter.rs  — route table, slippage rails, floor enforcement
//! ```
//!
//! The rule that matters: advisory quotes never touch the ledger. Only a
//! [`SwapResult`] produced by an executed conversion is creditable.

pub mod adapter;
pub mod venue;

pub use adapter::{ExchangeAdapter, ExchangeError, SwapQuote, SwapResult};
pub use venue::{SwapPath, SwapVenue, VenueError};

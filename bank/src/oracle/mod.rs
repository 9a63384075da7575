//! # Oracle Module — Price Feed Trust Boundary
//!
//! ```text
//! feed.rs     — the raw PriceFeed interface and round data shape
//! gateway.rs  — validation: positivity, heartbeat, round advancement
//! ```
//!
//! The gateway is the only component allowed to hand a price to the rest
//! of the engine. Raw feed rounds never cross this module's boundary.

pub mod feed;
pub mod gateway;

pub use feed::{FeedError, PriceFeed, RoundData};
pub use gateway::{OracleError, PriceOracleGateway, PriceQuote};

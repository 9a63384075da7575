//! Interactive CLI demo of the full AURUM operation lifecycle.
//!
//! Walks through bank construction, native and token deposits, a
//! composed swap-deposit with slippage protection, the risk limits
//! doing their job, and withdrawals. The output uses ANSI escape codes
//! for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use aurum_bank::asset::{
    AssetId, AssetMetadata, AssetTransfer, MetadataError, TransferError,
};
use aurum_bank::bank::{Bank, BankConfig};
use aurum_bank::exchange::{SwapVenue, VenueError};
use aurum_bank::ledger::Limits;
use aurum_bank::oracle::{FeedError, PriceFeed, RoundData};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";
const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                          {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    AURUM  --  Custodial Bank Engine Lifecycle Demo       {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                          {RESET}"
    );
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]===================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn rejected(text: &str) {
    println!("{YELLOW}  [REJECTED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

/// Renders a canonical (6-decimal) amount as dollars.
fn usd(value: u128) -> String {
    format!("{}.{:06} USD", value / 1_000_000, value % 1_000_000)
}

// ---------------------------------------------------------------------------
// Demo collaborators
// ---------------------------------------------------------------------------

struct DemoMetadata;

#[async_trait]
impl AssetMetadata for DemoMetadata {
    async fn decimals(&self, asset: AssetId) -> Result<u8, MetadataError> {
        match asset {
            AssetId::Native => Ok(18),
            _ => Ok(6),
        }
    }
}

struct DemoFeed;

#[async_trait]
impl PriceFeed for DemoFeed {
    async fn latest_round_data(&self) -> Result<RoundData, FeedError> {
        Ok(RoundData {
            round_id: 7,
            answer: 200_000_000_000, // 2000.00000000 USD
            updated_at: chrono::Utc::now().timestamp() as u64,
            answered_in_round: 7,
        })
    }

    fn decimals(&self) -> u8 {
        8
    }
}

struct DemoTransfers {
    balances: DashMap<(String, AssetId), u128>,
}

impl DemoTransfers {
    fn mint(&self, account: &str, asset: AssetId, amount: u128) {
        *self
            .balances
            .entry((account.to_string(), asset))
            .or_insert(0) += amount;
    }
}

#[async_trait]
impl AssetTransfer for DemoTransfers {
    async fn pull(&self, asset: AssetId, from: &str, amount: u128) -> Result<(), TransferError> {
        let mut source = self.balances.entry((from.to_string(), asset)).or_insert(0);
        if *source < amount {
            return Err(TransferError::InsufficientBalance {
                asset,
                requested: amount,
            });
        }
        *source -= amount;
        Ok(())
    }

    async fn push(&self, asset: AssetId, to: &str, amount: u128) -> Result<(), TransferError> {
        self.mint(to, asset, amount);
        Ok(())
    }
}

/// Venue filling at 99% of the quoted output.
struct DemoVenue;

#[async_trait]
impl SwapVenue for DemoVenue {
    async fn get_amounts_out(
        &self,
        amount_in: u128,
        path: &[AssetId],
    ) -> Result<Vec<u128>, VenueError> {
        let mut amounts = vec![amount_in];
        for _ in 1..path.len() {
            amounts.push(amount_in);
        }
        Ok(amounts)
    }

    async fn swap_exact_tokens_for_tokens(
        &self,
        amount_in: u128,
        _amount_out_min: u128,
        _path: &[AssetId],
        _recipient: &str,
        _deadline: u64,
    ) -> Result<Vec<u128>, VenueError> {
        Ok(vec![amount_in, amount_in * 99 / 100])
    }
}

// ---------------------------------------------------------------------------
// The walkthrough
// ---------------------------------------------------------------------------

const ADMIN: &str = "0xad00000000000000000000000000000000000000";
const CUSTODY: &str = "0xcc00000000000000000000000000000000000000";
const ALICE: &str = "0xaa00000000000000000000000000000000000000";

#[tokio::main]
async fn main() {
    banner();

    let settlement = AssetId::token([0xEE; 20]);
    let exotic = AssetId::token([0x77; 20]);
    let transfers = Arc::new(DemoTransfers {
        balances: DashMap::new(),
    });

    section(1, "Open the bank: $1,000,000 cap, $2,500 withdrawal ceiling");
    let bank = Bank::new(
        BankConfig::new(
            ADMIN,
            CUSTODY,
            settlement,
            Limits::new(1_000_000_000_000, 2_500_000_000),
        ),
        Arc::new(DemoMetadata),
        Arc::new(DemoFeed),
        Arc::new(DemoVenue),
        Arc::clone(&transfers) as Arc<dyn AssetTransfer>,
    )
    .await
    .expect("bank construction");
    success("bank constructed, settlement asset pre-registered");

    section(2, "Alice deposits 1.5 native units at a 2000.00 USD oracle price");
    transfers.mint(ALICE, AssetId::Native, 1_500_000_000_000_000_000);
    let receipt = bank
        .deposit_native(ALICE, 1_500_000_000_000_000_000)
        .await
        .expect("native deposit");
    success("deposit credited");
    info("credited value", &usd(receipt.value));
    info("bank total", &usd(bank.total_value()));

    section(3, "A swap-composed deposit: exotic token -> settlement asset");
    bank.set_conversion_route(ADMIN, exotic, vec![exotic, settlement])
        .expect("route");
    transfers.mint(ALICE, exotic, 500_000_000);
    let conv = bank
        .deposit_with_conversion(
            ALICE,
            exotic,
            500_000_000,
            480_000_000,
            chrono::Utc::now().timestamp() as u64 + 120,
        )
        .await
        .expect("conversion deposit");
    success("converted and credited the realized output");
    info("expected out", &usd(conv.expected_out));
    info("realized out", &usd(conv.realized_out));
    info("bank total", &usd(bank.total_value()));

    section(4, "The withdrawal ceiling earns its keep");
    match bank.withdraw_native(ALICE, 2_999_000_000).await {
        Err(e) => rejected(&e.to_string()),
        Ok(_) => unreachable!("ceiling should have caught this"),
    }
    let wd = bank
        .withdraw_native(ALICE, 2_000_000_000)
        .await
        .expect("withdrawal under the ceiling");
    success("withdrawal paid");
    info("paid out", &format!("{} native units", wd.amount_out));
    info("bank total", &usd(bank.total_value()));

    section(5, "Books balance");
    let counters = bank.counters();
    info("deposits", &counters.deposits.to_string());
    info("withdrawals", &counters.withdrawals.to_string());
    info("available capacity", &usd(bank.available_capacity()));
    println!();
    println!("{DIM}  The ledger never booked an advisory number, and it never will.{RESET}");
    println!();
}

//! # Operation Entry Guard
//!
//! At most one state-mutating operation may be in flight on a bank at a
//! time. The surrounding environment already runs operations to
//! completion, but the external calls inside an operation -- the asset
//! being pulled, the venue executing a swap -- are exactly the places a
//! malicious or buggy collaborator could try to re-enter before the first
//! operation's effects are finalized.
//!
//! The guard is a single atomic flag with RAII release: acquired before
//! the first external call, held across every `.await`, cleared on drop
//! no matter how the operation ends. Nested entry is rejected, not
//! queued -- a re-entrant call during a transfer is an attack, and
//! attacks don't get to wait in line.

use std::sync::atomic::{AtomicBool, Ordering};

/// The per-bank in-flight flag.
#[derive(Default)]
pub struct EntryFlag {
    in_flight: AtomicBool,
}

impl EntryFlag {
    /// Creates a flag with no operation in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to begin an operation. Returns `None` when one is
    /// already in flight.
    pub fn enter(&self) -> Option<EntryPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EntryPermit { flag: self })
    }

    /// Whether an operation is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Proof of exclusive entry. Dropping it -- normally or through any error
/// path -- reopens the bank for the next operation.
pub struct EntryPermit<'a> {
    flag: &'a EntryFlag,
}

impl Drop for EntryPermit<'_> {
    fn drop(&mut self) {
        self.flag.in_flight.store(false, Ordering::Release);
    }
}

//! The slot store and burner seams between the controller and its host.

use alloy_primitives::B256;
use auto_impl::auto_impl;

/// Failure surfaced by the pricing controller.
///
/// Either the backing store broke or the burner ran out of budget mid-update.
/// Both invalidate the enclosing block; arithmetic never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// The backing store failed to read or write a slot.
    #[error("storage access failed at slot {slot}: {reason}")]
    Storage {
        /// The slot being accessed.
        slot: u64,
        /// Backend-provided failure description.
        reason: String,
    },

    /// The burner's gas budget ran out during a state mutation.
    #[error("system gas exhausted: needed {needed}, remaining {remaining}")]
    GasExhausted {
        /// Gas the mutation would have cost.
        needed: u64,
        /// Gas left in the budget.
        remaining: u64,
    },
}

/// Accounts the gas the controller itself spends on storage traffic.
///
/// Every slot write is reported through [`restrict`](Burner::restrict) before
/// the word lands. A burner that cannot cover the cost fails the call, and
/// with it the enclosing block.
#[auto_impl(&mut, Box)]
pub trait Burner {
    /// Charges `gas` against the budget.
    fn restrict(&mut self, gas: u64) -> Result<(), PricingError>;
}

/// A flat map from fixed slot indices to 32-byte words, plus the burner that
/// meters the controller's writes.
///
/// Slot indices are part of the chain-state ABI: assigned at genesis, never
/// reassigned. Reading a never-written slot yields the zero word.
#[auto_impl(&mut, Box)]
pub trait SlotStore {
    /// Reads the word at `slot`.
    fn get_word(&mut self, slot: u64) -> Result<B256, PricingError>;

    /// Writes the word at `slot`.
    fn set_word(&mut self, slot: u64, word: B256) -> Result<(), PricingError>;

    /// The burner metering this store's mutations.
    fn burner(&mut self) -> &mut dyn Burner;
}

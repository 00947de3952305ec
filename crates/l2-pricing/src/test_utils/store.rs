use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::B256;

use crate::{Burner, PricingError, SlotStore};

/// A burner with no budget limit, standing in for the system burner that
/// meters block-boundary bookkeeping.
#[derive(Debug, Default, Clone)]
pub struct SystemBurner {
    burned: u64,
}

impl SystemBurner {
    /// Total gas charged so far.
    pub const fn burned(&self) -> u64 {
        self.burned
    }
}

impl Burner for SystemBurner {
    fn restrict(&mut self, gas: u64) -> Result<(), PricingError> {
        self.burned = self.burned.saturating_add(gas);
        Ok(())
    }
}

/// A burner with a finite budget. Mutations beyond it fail the block.
#[derive(Debug, Clone)]
pub struct RestrictedBurner {
    remaining: u64,
}

impl RestrictedBurner {
    /// Creates a burner with `budget` gas available.
    pub const fn new(budget: u64) -> Self {
        Self { remaining: budget }
    }

    /// Gas left in the budget.
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Burner for RestrictedBurner {
    fn restrict(&mut self, gas: u64) -> Result<(), PricingError> {
        if gas > self.remaining {
            return Err(PricingError::GasExhausted { needed: gas, remaining: self.remaining });
        }
        self.remaining -= gas;
        Ok(())
    }
}

/// An in-memory slot store.
#[derive(Debug, derive_more::Deref, derive_more::DerefMut)]
pub struct MemoryStore<B = SystemBurner> {
    #[deref]
    #[deref_mut]
    slots: BTreeMap<u64, B256>,
    poisoned: BTreeSet<u64>,
    burner: B,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(SystemBurner::default())
    }
}

impl<B: Burner> MemoryStore<B> {
    /// Creates an empty store metered by `burner`.
    pub const fn new(burner: B) -> Self {
        Self { slots: BTreeMap::new(), poisoned: BTreeSet::new(), burner }
    }

    /// Makes every future access of `slot` fail, to exercise fault paths.
    pub fn poison(&mut self, slot: u64) {
        self.poisoned.insert(slot);
    }

    /// Raw contents of every written slot, in slot order.
    pub fn snapshot(&self) -> Vec<(u64, B256)> {
        self.slots.iter().map(|(slot, word)| (*slot, *word)).collect()
    }

    fn check(&self, slot: u64) -> Result<(), PricingError> {
        if self.poisoned.contains(&slot) {
            return Err(PricingError::Storage { slot, reason: "poisoned".into() });
        }
        Ok(())
    }
}

impl<B: Burner> SlotStore for MemoryStore<B> {
    fn get_word(&mut self, slot: u64) -> Result<B256, PricingError> {
        self.check(slot)?;
        Ok(self.slots.get(&slot).copied().unwrap_or_default())
    }

    fn set_word(&mut self, slot: u64, word: B256) -> Result<(), PricingError> {
        self.check(slot)?;
        self.slots.insert(slot, word);
        Ok(())
    }

    fn burner(&mut self) -> &mut dyn Burner {
        &mut self.burner
    }
}

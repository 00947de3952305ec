//! The persisted pricing state and its typed accessors.

use alloy_primitives::{B256, U256};

use crate::{
    constants::{self, WORD_WRITE_GAS},
    sat_cast_i64, sat_ucast, Bips, PricingError, SlotStore,
};

/// Storage layout of the pricing state.
///
/// The indices are part of the chain-state ABI. They are assigned at genesis
/// and must never be reordered or reused, or existing chains lose their
/// state.
pub mod slots {
    /// slot 0: target gas consumption rate (u64, gas per second)
    pub const SPEED_LIMIT_PER_SECOND: u64 = 0;
    /// slot 1: hard cap on per-block gas (u64)
    pub const PER_BLOCK_GAS_LIMIT: u64 = 1;
    /// slot 2: current base fee (u256, wei)
    pub const BASE_FEE_WEI: u64 = 2;
    /// slot 3: base fee floor (u256, wei)
    pub const MIN_BASE_FEE_WEI: u64 = 3;
    /// slot 4: pool-based model's gas reservoir (i64, low limb)
    pub const GAS_POOL: u64 = 4;
    /// slot 5: reservoir snapshot at the previous block boundary (i64)
    pub const GAS_POOL_LAST_BLOCK: u64 = 5;
    /// slot 6: seconds of gas the reservoir holds when full (u64)
    pub const GAS_POOL_SECONDS: u64 = 6;
    /// slot 7: reservoir fullness target (basis points)
    pub const GAS_POOL_TARGET: u64 = 7;
    /// slot 8: weight of the pool ratio in the pricing mix (basis points)
    pub const GAS_POOL_WEIGHT: u64 = 8;
    /// slot 9: smoothed gas consumption rate (u64, gas per second)
    pub const RATE_ESTIMATE: u64 = 9;
    /// slot 10: seconds of memory in the rate estimate (u64)
    pub const RATE_ESTIMATE_INERTIA: u64 = 10;
    /// slot 11: accumulated over-limit burn (u64)
    pub const GAS_BACKLOG: u64 = 11;
    /// slot 12: smoothing constant of the backlog curve (u64)
    pub const PRICING_INERTIA: u64 = 12;
    /// slot 13: seconds of backlog absorbed before the fee reacts (u64)
    pub const BACKLOG_TOLERANCE: u64 = 13;
    /// slot 14: protocol version recorded at the last update (u64)
    pub const PROTOCOL_VERSION: u64 = 14;
}

/// Typed view over the controller's region of the backing store.
///
/// Holds no cache. Every accessor re-reads the store, which keeps the
/// controller a pure function of the storage snapshot and its inputs.
#[derive(Debug)]
pub struct L2PricingState<S> {
    store: S,
}

impl<S: SlotStore> L2PricingState<S> {
    /// Binds to an existing storage region without touching any value.
    pub const fn open(store: S) -> Self {
        Self { store }
    }

    /// Writes the genesis defaults and records the protocol version.
    pub fn initialize(store: S, version: u64) -> Result<Self, PricingError> {
        let mut state = Self::open(store);
        state.set_speed_limit_per_second(constants::INITIAL_SPEED_LIMIT_PER_SECOND)?;
        state.set_max_per_block_gas_limit(constants::INITIAL_PER_BLOCK_GAS_LIMIT)?;
        state.set_base_fee_wei(U256::from(constants::INITIAL_BASE_FEE_WEI))?;
        state.set_min_base_fee_wei(U256::from(constants::INITIAL_MINIMUM_BASE_FEE_WEI))?;
        state.set_gas_pool_seconds(constants::INITIAL_GAS_POOL_SECONDS)?;
        state.set_gas_pool_target(constants::INITIAL_GAS_POOL_TARGET)?;
        state.set_gas_pool_weight(constants::INITIAL_GAS_POOL_WEIGHT)?;
        let pool_max = state.gas_pool_max()?;
        state.set_gas_pool(pool_max)?;
        state.set_gas_pool_last_block(pool_max)?;
        state.set_rate_estimate(constants::INITIAL_SPEED_LIMIT_PER_SECOND)?;
        state.set_rate_estimate_inertia(constants::INITIAL_RATE_ESTIMATE_INERTIA)?;
        state.set_gas_backlog(0)?;
        state.set_pricing_inertia(constants::INITIAL_PRICING_INERTIA)?;
        state.set_backlog_tolerance(constants::INITIAL_BACKLOG_TOLERANCE)?;
        state.set_protocol_version(version)?;
        Ok(state)
    }

    /// Releases the backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Target gas consumption rate, in gas per second.
    pub fn speed_limit_per_second(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::SPEED_LIMIT_PER_SECOND)
    }

    /// Sets the target gas consumption rate.
    pub fn set_speed_limit_per_second(&mut self, limit: u64) -> Result<(), PricingError> {
        self.set_u64(slots::SPEED_LIMIT_PER_SECOND, limit)
    }

    /// Hard cap on the gas any single block may contain.
    pub fn max_per_block_gas_limit(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::PER_BLOCK_GAS_LIMIT)
    }

    /// Sets the hard per-block gas cap.
    pub fn set_max_per_block_gas_limit(&mut self, limit: u64) -> Result<(), PricingError> {
        self.set_u64(slots::PER_BLOCK_GAS_LIMIT, limit)
    }

    /// The current base fee, in wei.
    pub fn base_fee_wei(&mut self) -> Result<U256, PricingError> {
        self.get_u256(slots::BASE_FEE_WEI)
    }

    /// Sets the current base fee.
    pub fn set_base_fee_wei(&mut self, fee: U256) -> Result<(), PricingError> {
        self.set_u256(slots::BASE_FEE_WEI, fee)
    }

    /// The absolute floor on the base fee, in wei.
    pub fn min_base_fee_wei(&mut self) -> Result<U256, PricingError> {
        self.get_u256(slots::MIN_BASE_FEE_WEI)
    }

    /// Sets the base fee floor.
    pub fn set_min_base_fee_wei(&mut self, fee: U256) -> Result<(), PricingError> {
        self.set_u256(slots::MIN_BASE_FEE_WEI, fee)
    }

    /// The pool-based model's gas reservoir. Negative while burn outruns the
    /// refill.
    pub fn gas_pool(&mut self) -> Result<i64, PricingError> {
        self.get_i64(slots::GAS_POOL)
    }

    /// Sets the gas reservoir.
    pub fn set_gas_pool(&mut self, pool: i64) -> Result<(), PricingError> {
        self.set_i64(slots::GAS_POOL, pool)
    }

    /// The reservoir level snapshotted at the previous block boundary.
    pub fn gas_pool_last_block(&mut self) -> Result<i64, PricingError> {
        self.get_i64(slots::GAS_POOL_LAST_BLOCK)
    }

    /// Snapshots the reservoir level at a block boundary.
    pub fn set_gas_pool_last_block(&mut self, pool: i64) -> Result<(), PricingError> {
        self.set_i64(slots::GAS_POOL_LAST_BLOCK, pool)
    }

    /// Seconds of gas the reservoir holds when full.
    pub fn gas_pool_seconds(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::GAS_POOL_SECONDS)
    }

    /// Sets the reservoir depth, in seconds of gas at the speed limit.
    pub fn set_gas_pool_seconds(&mut self, seconds: u64) -> Result<(), PricingError> {
        self.set_u64(slots::GAS_POOL_SECONDS, seconds)
    }

    /// Upper bound on the reservoir: the speed limit sustained for
    /// [`gas_pool_seconds`](Self::gas_pool_seconds).
    pub fn gas_pool_max(&mut self) -> Result<i64, PricingError> {
        let speed_limit = self.speed_limit_per_second()?;
        let seconds = self.gas_pool_seconds()?;
        Ok(sat_cast_i64(seconds.saturating_mul(speed_limit)))
    }

    /// Reservoir fullness the pool-based model steers toward.
    pub fn gas_pool_target(&mut self) -> Result<Bips, PricingError> {
        self.get_bips(slots::GAS_POOL_TARGET)
    }

    /// Sets the reservoir fullness target.
    pub fn set_gas_pool_target(&mut self, target: Bips) -> Result<(), PricingError> {
        self.set_bips(slots::GAS_POOL_TARGET, target)
    }

    /// Weight of the pool ratio against the rate ratio in the pricing mix.
    pub fn gas_pool_weight(&mut self) -> Result<Bips, PricingError> {
        self.get_bips(slots::GAS_POOL_WEIGHT)
    }

    /// Sets the pool ratio weight.
    pub fn set_gas_pool_weight(&mut self, weight: Bips) -> Result<(), PricingError> {
        self.set_bips(slots::GAS_POOL_WEIGHT, weight)
    }

    /// Smoothed gas consumption rate, in gas per second.
    pub fn rate_estimate(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::RATE_ESTIMATE)
    }

    /// Sets the smoothed consumption rate.
    pub fn set_rate_estimate(&mut self, rate: u64) -> Result<(), PricingError> {
        self.set_u64(slots::RATE_ESTIMATE, rate)
    }

    /// Seconds of memory in the consumption-rate estimate.
    pub fn rate_estimate_inertia(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::RATE_ESTIMATE_INERTIA)
    }

    /// Sets the rate-estimate memory.
    pub fn set_rate_estimate_inertia(&mut self, inertia: u64) -> Result<(), PricingError> {
        self.set_u64(slots::RATE_ESTIMATE_INERTIA, inertia)
    }

    /// Gas burnt beyond what the speed limit permitted, not yet worked off.
    pub fn gas_backlog(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::GAS_BACKLOG)
    }

    /// Sets the gas backlog.
    pub fn set_gas_backlog(&mut self, backlog: u64) -> Result<(), PricingError> {
        self.set_u64(slots::GAS_BACKLOG, backlog)
    }

    /// Smoothing constant of the backlog-exponential pricing curve.
    pub fn pricing_inertia(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::PRICING_INERTIA)
    }

    /// Sets the backlog smoothing constant.
    pub fn set_pricing_inertia(&mut self, inertia: u64) -> Result<(), PricingError> {
        self.set_u64(slots::PRICING_INERTIA, inertia)
    }

    /// Seconds of over-limit burn absorbed before the fee reacts.
    pub fn backlog_tolerance(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::BACKLOG_TOLERANCE)
    }

    /// Sets the backlog tolerance.
    pub fn set_backlog_tolerance(&mut self, tolerance: u64) -> Result<(), PricingError> {
        self.set_u64(slots::BACKLOG_TOLERANCE, tolerance)
    }

    /// Protocol version recorded at the last update. Non-decreasing.
    pub fn protocol_version(&mut self) -> Result<u64, PricingError> {
        self.get_u64(slots::PROTOCOL_VERSION)
    }

    /// Records the protocol version.
    pub fn set_protocol_version(&mut self, version: u64) -> Result<(), PricingError> {
        self.set_u64(slots::PROTOCOL_VERSION, version)
    }

    fn get_u64(&mut self, slot: u64) -> Result<u64, PricingError> {
        Ok(self.get_u256(slot)?.saturating_to::<u64>())
    }

    fn set_u64(&mut self, slot: u64, value: u64) -> Result<(), PricingError> {
        self.set_u256(slot, U256::from(value))
    }

    // i64 values live in the low limb as their two's-complement bit pattern
    fn get_i64(&mut self, slot: u64) -> Result<i64, PricingError> {
        Ok(self.get_u256(slot)?.wrapping_to::<u64>() as i64)
    }

    fn set_i64(&mut self, slot: u64, value: i64) -> Result<(), PricingError> {
        self.set_u256(slot, U256::from(value as u64))
    }

    fn get_bips(&mut self, slot: u64) -> Result<Bips, PricingError> {
        Ok(Bips(sat_cast_i64(self.get_u64(slot)?)))
    }

    fn set_bips(&mut self, slot: u64, value: Bips) -> Result<(), PricingError> {
        self.set_u64(slot, sat_ucast(value.raw()))
    }

    fn get_u256(&mut self, slot: u64) -> Result<U256, PricingError> {
        Ok(U256::from_be_bytes(self.store.get_word(slot)?.0))
    }

    fn set_u256(&mut self, slot: u64, value: U256) -> Result<(), PricingError> {
        self.store.burner().restrict(WORD_WRITE_GAS)?;
        self.store.set_word(slot, B256::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[test]
    fn signed_values_round_trip() {
        let mut state = L2PricingState::open(MemoryStore::default());
        for value in [0, 1, -1, i64::MAX, i64::MIN, -600_000_000] {
            state.set_gas_pool(value).unwrap();
            assert_eq!(state.gas_pool().unwrap(), value);
        }
    }

    #[test]
    fn unwritten_slots_read_as_zero() {
        let mut state = L2PricingState::open(MemoryStore::default());
        assert_eq!(state.gas_backlog().unwrap(), 0);
        assert_eq!(state.base_fee_wei().unwrap(), U256::ZERO);
        assert_eq!(state.gas_pool().unwrap(), 0);
    }
}

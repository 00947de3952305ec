//! Genesis defaults and consensus constants of the fee market.

use crate::Bips;

/// Target gas consumption rate at genesis, in gas per second.
pub const INITIAL_SPEED_LIMIT_PER_SECOND: u64 = 1_000_000;
/// Hard cap on the gas any single block may contain at genesis.
pub const INITIAL_PER_BLOCK_GAS_LIMIT: u64 = 20 * 1_000_000;
/// Absolute floor on the base fee at genesis: 0.1 gwei.
pub const INITIAL_MINIMUM_BASE_FEE_WEI: u64 = 100_000_000;
/// The base fee starts at its floor.
pub const INITIAL_BASE_FEE_WEI: u64 = INITIAL_MINIMUM_BASE_FEE_WEI;
/// Seconds of gas the pool holds when full, at the speed limit.
pub const INITIAL_GAS_POOL_SECONDS: u64 = 10 * 60;
/// Seconds of memory in the consumption-rate estimate.
pub const INITIAL_RATE_ESTIMATE_INERTIA: u64 = 60;
/// Smoothing constant of the backlog-exponential pricing curve.
pub const INITIAL_PRICING_INERTIA: u64 = 102;
/// Seconds of over-limit burn absorbed before the backlog model reacts.
pub const INITIAL_BACKLOG_TOLERANCE: u64 = 10;
/// Pool fullness the pool-based model steers toward.
pub const INITIAL_GAS_POOL_TARGET: Bips = Bips::from_percent(80);
/// Weight of the pool ratio against the rate ratio in the pool-based mix.
pub const INITIAL_GAS_POOL_WEIGHT: Bips = Bips::from_percent(60);

/// Maximum multiplicative base-fee increase a single block may apply under
/// the pool-based model.
pub const ELASTICITY_MULTIPLIER: u64 = 2;

/// Gas charged to the burner for every storage word the controller writes.
pub const WORD_WRITE_GAS: u64 = 5_000;

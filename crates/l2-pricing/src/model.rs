//! The per-block pricing update: two algorithms behind one set of entry
//! points, selected by protocol version.

use alloy_primitives::U256;
use tracing::{debug, warn};

use crate::{
    approx_exp_bips, big_mul_by_bips, big_mul_by_uint, constants::ELASTICITY_MULTIPLIER,
    int_mul_by_bips, sat_cast_i64, sat_ucast, weighted_average_bips, Bips, L2PricingState,
    PricingError, SlotStore, UFrac, ONE_IN_BIPS,
};

/// First protocol version that prices purely off the gas backlog. Earlier
/// versions run the pool-based controller.
pub const FIRST_EXPONENTIAL_PRICING_VERSION: u64 = 4;

/// Versions below this cap the pool-based ratio mix at 200%.
const UNCAPPED_RATIO_MIX_VERSION: u64 = 3;

/// Per-second fee adjustment is spread over this many seconds, matching the
/// EIP-1559 bound of doubling once every two minutes.
const SECONDS_PER_DOUBLING: i64 = 120;

impl<S: SlotStore> L2PricingState<S> {
    /// Credits (positive) or debits (negative) gas against the per-version
    /// accounting entity. Execution reports burns as negative amounts.
    pub fn add_to_gas_pool(&mut self, gas: i64, version: u64) -> Result<(), PricingError> {
        if version < FIRST_EXPONENTIAL_PRICING_VERSION {
            let pool = self.gas_pool()?;
            return self.set_gas_pool(pool.saturating_add(gas));
        }
        // pay off some of the backlog with the added gas, stopping at 0
        let backlog = self.gas_backlog()?;
        let backlog = sat_ucast(sat_cast_i64(backlog).saturating_sub(gas));
        self.set_gas_backlog(backlog)
    }

    /// Advances the fee market by one block.
    ///
    /// `prev_base_fee` and `time_passed` come from the previous block header,
    /// never from a clock. The `debug` flag gates diagnostic events only and
    /// must not influence the outcome.
    pub fn update_pricing_model(
        &mut self,
        prev_base_fee: U256,
        time_passed: u64,
        version: u64,
        debug: bool,
    ) -> Result<(), PricingError> {
        let recorded = self.protocol_version()?;
        debug_assert!(
            version >= recorded,
            "pricing update at version {version} older than recorded {recorded}"
        );
        if version > recorded {
            self.set_protocol_version(version)?;
        }

        if version < FIRST_EXPONENTIAL_PRICING_VERSION {
            return self.update_pricing_model_pool(prev_base_fee, time_passed, version, debug);
        }

        // work the backlog off at the speed limit before repricing
        let speed_limit = self.speed_limit_per_second()?;
        self.add_to_gas_pool(sat_cast_i64(time_passed.saturating_mul(speed_limit)), version)?;

        let inertia = self.pricing_inertia()?;
        let tolerance = self.backlog_tolerance()?;
        let backlog = self.gas_backlog()?;
        let min_base_fee = self.min_base_fee_wei()?;

        let mut base_fee = min_base_fee;
        let forgivable = tolerance.saturating_mul(speed_limit);
        if backlog > forgivable {
            let excess = sat_cast_i64(backlog - forgivable);
            let divisor = sat_cast_i64(inertia.saturating_mul(speed_limit));
            let exponent = if divisor == 0 {
                Bips(i64::MAX)
            } else {
                Bips(Bips::from_natural(excess).raw() / divisor)
            };
            base_fee = big_mul_by_bips(min_base_fee, approx_exp_bips(exponent));
        }
        if debug {
            debug!(backlog, forgivable, time_passed, %base_fee, "backlog pricing update");
        }
        self.set_base_fee_wei(base_fee)
    }

    /// The pool-based controller used before
    /// [`FIRST_EXPONENTIAL_PRICING_VERSION`].
    fn update_pricing_model_pool(
        &mut self,
        prev_base_fee: U256,
        time_passed: u64,
        version: u64,
        debug: bool,
    ) -> Result<(), PricingError> {
        // update the rate estimate, the weighted average of past and present
        //     rate' = (memory * rate + used) / (memory + passed)
        let pool_max = self.gas_pool_max()?;
        let gas_pool = self.gas_pool()?.min(pool_max);
        let gas_pool_last_block = self.gas_pool_last_block()?.min(pool_max);
        let gas_used = gas_pool_last_block.wrapping_sub(gas_pool) as u64;
        let rate_inertia = self.rate_estimate_inertia()?;
        let prior_rate = self.rate_estimate()?;
        let rate = rate_inertia.saturating_mul(prior_rate).saturating_add(gas_used)
            / rate_inertia.saturating_add(time_passed);
        self.set_rate_estimate(rate)?;

        //     ratio = recent gas consumption rate / speed limit
        let speed_limit = self.speed_limit_per_second()?.max(1);
        let rate_ratio = UFrac::new(rate, speed_limit);

        // refill the pool at the speed limit, averaging its level over the
        // interval; if it saturates mid-interval, integrate through the
        // moment it fills
        //     pool' = min(maximum, pool + speed * passed)
        let space_before = sat_ucast(pool_max.saturating_sub(gas_pool));
        let time_to_full = space_before / speed_limit;
        let (average_pool, new_gas_pool) = if time_passed > time_to_full {
            let average = (pool_max as u64).saturating_sub(
                space_before.saturating_mul(space_before)
                    / speed_limit.saturating_mul(2).saturating_mul(time_passed),
            );
            (average, pool_max)
        } else {
            let refill = time_passed.saturating_mul(speed_limit);
            let average = sat_ucast(gas_pool).saturating_add(refill / 2);
            (average, gas_pool.saturating_add(sat_cast_i64(refill)))
        };

        //     ratio = max(0, 2 - (average fullness) / (target fullness))
        let pool_target = self.gas_pool_target()?;
        let pool_target_gas = sat_ucast(int_mul_by_bips(pool_max, pool_target));
        let pool_ratio = if (average_pool as u128) < 2 * pool_target_gas as u128 {
            UFrac::new((2 * pool_target_gas as u128 - average_pool as u128) as u64, pool_target_gas)
        } else {
            UFrac::ZERO
        };

        // take the weighted average of the ratios, in basis points
        //     average = weight * pool + (1 - weight) * rate
        let pool_weight = self.gas_pool_weight()?;
        let mut average_of_ratios = weighted_average_bips(pool_weight, pool_ratio, rate_ratio);
        if version < UNCAPPED_RATIO_MIX_VERSION && average_of_ratios > 20_000 {
            average_of_ratios = 20_000;
        }

        // step the price, adjusting each second by the max EIP-1559 allows
        //     price' = price * exp(seconds at intensity / 2 mins)
        let exponent = Bips(
            sat_cast_i64(average_of_ratios)
                .saturating_sub(ONE_IN_BIPS.raw())
                .saturating_mul(sat_cast_i64(time_passed))
                / SECONDS_PER_DOUBLING,
        );
        let mut price = big_mul_by_bips(prev_base_fee, approx_exp_bips(exponent));
        let max_price = big_mul_by_uint(prev_base_fee, ELASTICITY_MULTIPLIER);
        let min_price = self.min_base_fee_wei()?;

        if debug {
            debug!(gas_used, time_passed, rate, speed_limit, "consumption rate");
            debug!(gas_pool, pool_max, average_pool, new_gas_pool, "gas pool");
            debug!(average_of_ratios, exponent = exponent.raw(), "ratio mix");
            debug!(%prev_base_fee, %price, %min_price, %max_price, "price step");
        }

        if price < min_price {
            price = min_price;
        }
        if price > max_price {
            warn!(%price, %max_price, "base fee step clamped at the elasticity bound");
            price = max_price;
        }

        self.set_base_fee_wei(price)?;
        self.set_gas_pool(new_gas_pool)?;
        self.set_gas_pool_last_block(new_gas_pool)
    }

    /// Gas available to the next block.
    pub fn per_block_gas_limit(&mut self, version: u64) -> Result<u64, PricingError> {
        let max_limit = self.max_per_block_gas_limit()?;
        if version >= FIRST_EXPONENTIAL_PRICING_VERSION {
            return Ok(max_limit);
        }
        let pool = self.gas_pool()?;
        if pool < 0 {
            Ok(0)
        } else {
            Ok((pool as u64).min(max_limit))
        }
    }
}

//! Deterministic gas pricing for an L2 fee market.
//!
//! On every block the controller folds the gas burnt since the previous
//! block and the seconds elapsed into its persisted state, then writes back
//! the next base fee. Two algorithms live behind the same entry points,
//! selected by protocol version: a pool-based controller for early versions
//! and a backlog-exponential one from
//! [`FIRST_EXPONENTIAL_PRICING_VERSION`] on. Every validator must reproduce
//! the update bit-for-bit, so all arithmetic saturates and no floating point
//! is used anywhere.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod constants;

mod math;
pub use math::*;

mod storage;
pub use storage::*;

mod state;
pub use state::*;

mod model;
pub use model::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

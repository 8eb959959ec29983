//! Recovery orchestration for categorized errors
//!
//! A [`RecoveryManager`] keeps an ordered registry of [`RecoveryStrategy`]
//! implementations. For each error it tries every matching strategy in
//! registration order, retrying with exponential backoff, until one succeeds
//! or all of them are exhausted.

mod backoff;
pub mod builtin;
mod manager;
mod rule;
mod strategy;

pub use backoff::RecoveryConfig;
pub use builtin::{BuiltinStrategy, Probe};
pub use manager::RecoveryManager;
pub use rule::MatchRule;
pub use strategy::{FnStrategy, RecoveryStrategy, StrategyOutcome};

//! Benchmarks for whole-engine scenarios.

mod chain;
mod voices;

pub use chain::bench_chain;
pub use voices::bench_voices;

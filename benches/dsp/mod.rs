//! Benchmarks for low-level DSP primitives.

mod body;
mod convolver;
mod oversampler;
mod reed;

pub use body::bench_body;
pub use convolver::bench_convolver;
pub use oversampler::bench_oversampler;
pub use reed::bench_reed;

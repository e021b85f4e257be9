//! Low-level DSP primitives used by the engine.
//!
//! Everything here allocates at construction only and is realtime-safe
//! afterwards. The modules stay focused on the signal-processing math; the
//! engine decides what runs at which rate.

/// RBJ band-pass biquad sections.
pub mod biquad;
/// Parallel modal filters plus waveguide cavity.
pub mod body;
/// Uniformly partitioned FFT convolution.
pub mod convolver;
/// Damped feedback delay line.
pub mod delay;
/// Polyphase FIR up/down sampling.
pub mod oversampler;

pub use body::{BodyConfig, BodyMode, BodyResonator};

//! Partitioned Convolver - uniformly partitioned overlap-save convolution.
//!
//! The impulse response is cut into `P`-sample partitions, each zero-padded
//! to `2P` and transformed once at construction. Every call to `process`
//! transforms the last two input blocks, stores that spectrum in a frequency
//! domain delay line (one slot per partition) and multiply-accumulates slot
//! `k` blocks old against partition `k`:
//!
//! ```text
//! Y = X[i]·H[0] + X[i-1]·H[1] + ... + X[i-K+1]·H[K-1]
//! ```
//!
//! The last `P` samples of the inverse transform are the output. Impulse
//! responses of any length convolve exactly, the stage adds no delay beyond
//! the block itself, and the cost per block is one forward FFT, one inverse
//! FFT and `K` complex multiply-accumulates of length `2P`.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{Error, Result};

pub struct PartitionedConvolver {
    partition: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    ir_spectra: Vec<Vec<Complex<f32>>>,
    /// Input spectra, newest at `fdl_pos`.
    fdl: Vec<Vec<Complex<f32>>>,
    fdl_pos: usize,
    /// Previous block followed by the current one.
    window: Vec<f32>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl PartitionedConvolver {
    pub fn new(impulse_response: &[f32], partition: usize) -> Result<Self> {
        if impulse_response.is_empty() {
            return Err(Error::EmptyImpulseResponse);
        }
        if partition == 0 {
            return Err(Error::InvalidConfig("convolver partition must be non-zero".into()));
        }

        let size = 2 * partition;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::default(); scratch_len];

        let ir_spectra: Vec<Vec<Complex<f32>>> = impulse_response
            .chunks(partition)
            .map(|part| {
                let mut spectrum = vec![Complex::default(); size];
                for (bin, &h) in spectrum.iter_mut().zip(part) {
                    *bin = Complex::new(h, 0.0);
                }
                fft.process_with_scratch(&mut spectrum, &mut scratch);
                spectrum
            })
            .collect();

        let partitions = ir_spectra.len();

        Ok(Self {
            partition,
            fft,
            ifft,
            ir_spectra,
            fdl: vec![vec![Complex::default(); size]; partitions],
            fdl_pos: 0,
            window: vec![0.0; size],
            accum: vec![Complex::default(); size],
            scratch,
        })
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn partitions(&self) -> usize {
        self.ir_spectra.len()
    }

    /// Added delay in samples. Overlap-save with a full-block hop adds none.
    pub fn latency(&self) -> usize {
        0
    }

    /// Convolve one block in place. `block.len()` must equal the partition
    /// size given at construction.
    pub fn process(&mut self, block: &mut [f32]) {
        let p = self.partition;
        debug_assert_eq!(block.len(), p);

        self.window.copy_within(p.., 0);
        self.window[p..].copy_from_slice(block);

        let slot = &mut self.fdl[self.fdl_pos];
        for (bin, &x) in slot.iter_mut().zip(&self.window) {
            *bin = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(slot, &mut self.scratch);

        self.accum.fill(Complex::default());
        let slots = self.fdl.len();
        for (age, h) in self.ir_spectra.iter().enumerate() {
            let x = &self.fdl[(self.fdl_pos + slots - age) % slots];
            for ((acc, x), h) in self.accum.iter_mut().zip(x).zip(h) {
                *acc += x * h;
            }
        }

        self.ifft
            .process_with_scratch(&mut self.accum, &mut self.scratch);

        let scale = 1.0 / (2 * p) as f32;
        for (out, y) in block.iter_mut().zip(&self.accum[p..]) {
            *out = y.re * scale;
        }

        self.fdl_pos = (self.fdl_pos + 1) % slots;
    }

    pub fn reset(&mut self) {
        self.window.fill(0.0);
        for slot in &mut self.fdl {
            slot.fill(Complex::default());
        }
        self.fdl_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn direct(x: &[f32], h: &[f32]) -> Vec<f32> {
        (0..x.len())
            .map(|n| {
                (0..h.len())
                    .filter(|&k| k <= n)
                    .map(|k| x[n - k] * h[k])
                    .sum::<f32>()
            })
            .collect()
    }

    fn run(conv: &mut PartitionedConvolver, input: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(input.len());
        for chunk in input.chunks(conv.partition()) {
            let mut block = chunk.to_vec();
            conv.process(&mut block);
            out.extend(block);
        }
        out
    }

    #[test]
    fn test_unit_impulse_reproduces_short_ir() {
        let ir: Vec<f32> = (0..96).map(|i| 0.9f32.powi(i) * if i % 2 == 0 { 1.0 } else { -0.5 }).collect();
        let mut conv = PartitionedConvolver::new(&ir, 64).unwrap();

        let mut input = vec![0.0; 256];
        input[0] = 1.0;
        let out = run(&mut conv, &input);

        for (i, &y) in out.iter().enumerate() {
            let expected = ir.get(i).copied().unwrap_or(0.0);
            approx::assert_abs_diff_eq!(y, expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_long_ir_matches_direct_convolution() {
        let mut rng = StdRng::seed_from_u64(3);
        let ir: Vec<f32> = (0..1000).map(|_| rng.gen_range(-1.0..1.0) * 0.1).collect();
        let input: Vec<f32> = (0..2048).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let mut conv = PartitionedConvolver::new(&ir, 128).unwrap();
        assert_eq!(conv.partitions(), 8);

        let got = run(&mut conv, &input);
        let expected = direct(&input, &ir);
        for (a, b) in got.iter().zip(&expected) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_identity_ir_passes_through() {
        let mut conv = PartitionedConvolver::new(&[1.0], 32).unwrap();
        let input: Vec<f32> = (0..96).map(|i| (i as f32 * 0.3).sin()).collect();
        let out = run(&mut conv, &input);
        for (a, b) in out.iter().zip(&input) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-5);
        }
        assert_eq!(conv.latency(), 0);
    }

    #[test]
    fn test_reset_forgets_history() {
        let ir = vec![0.5; 100];
        let mut conv = PartitionedConvolver::new(&ir, 16).unwrap();
        let mut block = vec![1.0; 16];
        conv.process(&mut block);
        conv.reset();

        let mut silent = vec![0.0; 16];
        for _ in 0..10 {
            conv.process(&mut silent);
            assert!(silent.iter().all(|y| y.abs() < 1e-6));
        }
    }

    #[test]
    fn test_rejects_bad_construction() {
        assert!(matches!(
            PartitionedConvolver::new(&[], 64),
            Err(Error::EmptyImpulseResponse)
        ));
        assert!(matches!(
            PartitionedConvolver::new(&[1.0], 0),
            Err(Error::InvalidConfig(_))
        ));
    }
}

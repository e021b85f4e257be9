//! Oversampler - polyphase FIR rate conversion by an integer factor.
//!
//! # Kernel
//!
//! One Hamming-windowed sinc lowpass with cutoff at the original Nyquist,
//! normalized to unit DC gain, serves both directions. Its length is
//! `2 · half · factor + 1`, so each direction adds `half` output-rate samples
//! of group delay and a round trip adds exactly [`Oversampler::latency`].
//!
//! # Upsampling
//!
//! Zero-stuffing then filtering wastes `factor - 1` of every `factor`
//! multiplies on zeros. The polyphase form skips them: output phase `p` only
//! ever sees kernel taps `p, p + L, p + 2L, ...`.
//!
//! ```text
//! x[m] ──┬──→ [h_0] ──→ y[mL + 0]
//!        ├──→ [h_1] ──→ y[mL + 1]
//!        └──→ [h_L-1] → y[mL + L-1]
//! ```
//!
//! The result is scaled by `factor` to restore the passband level lost to
//! zero-stuffing.
//!
//! # Downsampling
//!
//! Filter at the high rate, keep every `factor`-th sample. Only the kept
//! samples are computed.
//!
//! # Block boundaries
//!
//! Both directions keep a history ring of their most recent inputs, so a
//! stream cut into blocks of any size produces the same samples as the
//! stream processed whole.

use std::f64::consts::{PI, TAU};

use crate::error::{Error, Result};

/// History ring written twice so the last `len` samples are always one
/// contiguous slice.
struct History {
    buffer: Vec<f32>,
    len: usize,
    pos: usize,
}

impl History {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len * 2],
            len,
            pos: 0,
        }
    }

    #[inline]
    fn push(&mut self, sample: f32) {
        self.pos += 1;
        if self.pos == self.len {
            self.pos = 0;
        }
        self.buffer[self.pos] = sample;
        self.buffer[self.pos + self.len] = sample;
    }

    /// Oldest first, newest last.
    #[inline]
    fn window(&self) -> &[f32] {
        &self.buffer[self.pos + 1..self.pos + 1 + self.len]
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Hamming-windowed sinc lowpass, `len` taps, cutoff in cycles per sample.
pub fn windowed_sinc(len: usize, cutoff: f64) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    let centre = (len - 1) as f64 / 2.0;
    let taps: Vec<f64> = (0..len)
        .map(|n| {
            let t = n as f64 - centre;
            let sinc = if t == 0.0 {
                2.0 * cutoff
            } else {
                (TAU * cutoff * t).sin() / (PI * t)
            };
            let window = 0.54 - 0.46 * (TAU * n as f64 / (len - 1) as f64).cos();
            sinc * window
        })
        .collect();

    let dc: f64 = taps.iter().sum();
    taps.iter().map(|&h| (h / dc) as f32).collect()
}

pub struct Oversampler {
    factor: usize,
    half: usize,
    kernel: Vec<f32>,
    /// Per-phase taps reversed to line up with `History::window`.
    phases: Vec<Vec<f32>>,
    up_history: History,
    down_history: History,
}

impl Oversampler {
    /// `taps` is the requested kernel length; it is rounded to
    /// `2 · half · factor + 1` with `half >= 1`.
    pub fn new(factor: usize, taps: usize) -> Result<Self> {
        if factor == 0 {
            return Err(Error::InvalidConfig("oversampling factor must be at least 1".into()));
        }

        let half = (taps / (2 * factor)).max(1);
        let len = if factor == 1 { 1 } else { 2 * half * factor + 1 };
        let kernel = windowed_sinc(len, 0.5 / factor as f64);

        let phases: Vec<Vec<f32>> = (0..factor)
            .map(|p| {
                let mut phase: Vec<f32> = kernel.iter().skip(p).step_by(factor).copied().collect();
                phase.reverse();
                phase
            })
            .collect();
        let phase_len = phases.first().map_or(1, Vec::len);

        Ok(Self {
            factor,
            half: if factor == 1 { 0 } else { half },
            up_history: History::new(phase_len),
            down_history: History::new(kernel.len()),
            kernel,
            phases,
        })
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    pub fn kernel(&self) -> &[f32] {
        &self.kernel
    }

    /// Round-trip (up then down) delay in output-rate samples.
    pub fn latency(&self) -> usize {
        2 * self.half
    }

    /// `output.len()` must be `input.len() * factor`.
    pub fn upsample_into(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(output.len(), input.len() * self.factor);
        if self.factor == 1 {
            output.copy_from_slice(input);
            return;
        }

        let gain = self.factor as f32;
        for (&x, frame) in input.iter().zip(output.chunks_exact_mut(self.factor)) {
            self.up_history.push(x);
            let window = self.up_history.window();
            for (out, phase) in frame.iter_mut().zip(&self.phases) {
                let taps = phase.len();
                *out = gain * dot(&window[window.len() - taps..], phase);
            }
        }
    }

    /// `input.len()` must be `output.len() * factor`.
    pub fn downsample_into(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len() * self.factor);
        if self.factor == 1 {
            output.copy_from_slice(input);
            return;
        }

        for (frame, out) in input.chunks_exact(self.factor).zip(output.iter_mut()) {
            self.down_history.push(frame[0]);
            // Symmetric kernel: no reversal needed
            *out = dot(self.down_history.window(), &self.kernel);
            for &z in &frame[1..] {
                self.down_history.push(z);
            }
        }
    }

    /// Allocating form of [`upsample_into`](Self::upsample_into).
    pub fn upsample(&mut self, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0; input.len() * self.factor];
        self.upsample_into(input, &mut output);
        output
    }

    /// Allocating form of [`downsample_into`](Self::downsample_into).
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn downsample(&mut self, input: &[f32]) -> Vec<f32> {
        let frames = input.len() / self.factor;
        let mut output = vec![0.0; frames];
        self.downsample_into(&input[..frames * self.factor], &mut output);
        output
    }

    pub fn reset(&mut self) {
        self.up_history.reset();
        self.down_history.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TAU * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    #[test]
    fn test_kernel_has_unit_dc_gain() {
        for factor in [2, 3, 4] {
            let os = Oversampler::new(factor, 32).unwrap();
            let sum: f32 = os.kernel().iter().sum();
            approx::assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
            assert_eq!(os.kernel().len() % (2 * factor), 1);
        }
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let os = Oversampler::new(4, 48).unwrap();
        let k = os.kernel();
        for i in 0..k.len() / 2 {
            approx::assert_abs_diff_eq!(k[i], k[k.len() - 1 - i], epsilon = 1e-7);
        }
    }

    #[test]
    fn test_upsample_preserves_dc() {
        let mut os = Oversampler::new(4, 64).unwrap();
        let out = os.upsample(&vec![1.0; 256]);
        for &y in &out[out.len() / 2..] {
            approx::assert_abs_diff_eq!(y, 1.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_round_trip_recovers_sine() {
        let sr = 48_000.0;
        for factor in [2, 4] {
            let mut os = Oversampler::new(factor, 64).unwrap();
            let x = sine(1_000.0, sr, 2048);
            let up = os.upsample(&x);
            let y = os.downsample(&up);
            let delay = os.latency();

            for m in 256..x.len() {
                approx::assert_abs_diff_eq!(y[m], x[m - delay], epsilon = 1e-2);
            }
        }
    }

    #[test]
    fn test_blocks_are_continuous() {
        let x = sine(3_000.0, 48_000.0, 1024);

        let mut whole = Oversampler::new(2, 32).unwrap();
        let up = whole.upsample(&x);
        let expected = whole.downsample(&up);

        let mut blocked = Oversampler::new(2, 32).unwrap();
        let mut got = Vec::new();
        for block in x.chunks(100) {
            let up = blocked.upsample(block);
            got.extend(blocked.downsample(&up));
        }

        assert_eq!(got.len(), expected.len());
        for (a, b) in got.iter().zip(&expected) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rejects_image_band() {
        // A tone just above the original Nyquist, at the high rate, must not
        // survive decimation.
        let mut os = Oversampler::new(2, 64).unwrap();
        let hi = sine(40_000.0, 96_000.0, 4096);
        let y = os.downsample(&hi);
        let peak = y[256..].iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        assert!(peak < 0.05, "image leaked with peak {}", peak);
    }

    #[test]
    fn test_factor_one_is_identity() {
        let mut os = Oversampler::new(1, 32).unwrap();
        let x = sine(440.0, 48_000.0, 128);
        assert_eq!(os.upsample(&x), x);
        assert_eq!(os.downsample(&x), x);
        assert_eq!(os.latency(), 0);
    }

    #[test]
    fn test_zero_factor_is_rejected() {
        assert!(matches!(Oversampler::new(0, 32), Err(Error::InvalidConfig(_))));
    }
}

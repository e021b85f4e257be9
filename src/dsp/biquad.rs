use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| gain shape     | b0          | b1 | b2           | peak gain |
| -------------- | ----------- | -- | ------------ | --------- |
| constant skirt | sin(w0) / 2 | 0  | -sin(w0) / 2 | Q         |
| constant peak  | alpha       | 0  | -alpha       | 0 dB      |

a0 = 1 + alpha, a1 = -2 cos(w0), a2 = 1 - alpha, alpha = sin(w0) / 2Q
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandPassGain {
    #[default]
    ConstantSkirt,
    ConstantPeak,
}

/// Normalized biquad coefficients (`a0` already divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// RBJ cookbook band-pass centred on `center_hz`.
    pub fn band_pass(center_hz: f64, q: f64, sample_rate: f64, gain: BandPassGain) -> Self {
        let w0 = TAU * center_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let b0 = match gain {
            BandPassGain::ConstantSkirt => 0.5 * sin_w0,
            BandPassGain::ConstantPeak => alpha,
        };
        let a0 = 1.0 + alpha;

        Self {
            b0: b0 / a0,
            b1: 0.0,
            b2: -b0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let w = TAU * freq_hz / sample_rate;
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// Direct Form I section: two samples of input and output history.
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn band_pass(center_hz: f64, q: f64, sample_rate: f64, gain: BandPassGain) -> Self {
        Self::new(BiquadCoeffs::band_pass(center_hz, q, sample_rate, gain))
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

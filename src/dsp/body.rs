//! Body Resonator - the wooden case and air cavity of the instrument.
//!
//! ```text
//!          ┌──→ [BP 650 Hz]  ──┐
//!          ├──→ [BP 1200 Hz] ──┼──→ mean ──┐
//! input ───┼──→ [BP 2400 Hz] ──┘           (+) ──→ output
//!          └──→ [waveguide] ──→ × mix ─────┘
//! ```
//!
//! Both branches see the same dry input and run every sample. Setting the
//! waveguide mix to zero leaves only the modal filters. Non-finite input is
//! read as silence so filter state never latches to NaN.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::biquad::{BandPassGain, Biquad};
use crate::dsp::delay::Waveguide;

/// One resonant mode of the body.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMode {
    pub frequency: f64,
    pub q: f64,
}

impl BodyMode {
    pub const fn new(frequency: f64, q: f64) -> Self {
        Self { frequency, q }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub modes: Vec<BodyMode>,
    pub gain: BandPassGain,
    /// Round-trip time of the cavity (seconds).
    pub waveguide_delay: f64,
    pub waveguide_feedback: f64,
    /// One-pole lowpass coefficient on the reflection, 0 = none.
    pub waveguide_damping: f64,
    /// Level of the waveguide branch summed into the output.
    pub waveguide_mix: f64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            modes: vec![
                BodyMode::new(650.0, 6.0),
                BodyMode::new(1200.0, 4.0),
                BodyMode::new(2400.0, 3.0),
            ],
            gain: BandPassGain::ConstantSkirt,
            waveguide_delay: 0.0125,
            waveguide_feedback: 0.7,
            waveguide_damping: 0.3,
            waveguide_mix: 0.5,
        }
    }
}

impl BodyConfig {
    /// Waveguide length in samples at `sample_rate`, at least one.
    pub fn waveguide_length(&self, sample_rate: f64) -> usize {
        ((self.waveguide_delay * sample_rate).round() as usize).max(1)
    }
}

pub struct BodyResonator {
    modes: Vec<Biquad>,
    waveguide: Waveguide,
    waveguide_mix: f64,
    inv_modes: f64,
}

impl BodyResonator {
    /// Design every mode filter for `sample_rate`. Coefficients are fixed from
    /// here on.
    pub fn new(config: &BodyConfig, sample_rate: f64) -> Self {
        let modes: Vec<Biquad> = config
            .modes
            .iter()
            .map(|m| Biquad::band_pass(m.frequency, m.q, sample_rate, config.gain))
            .collect();
        let inv_modes = if modes.is_empty() {
            0.0
        } else {
            1.0 / modes.len() as f64
        };

        Self {
            modes,
            waveguide: Waveguide::new(
                config.waveguide_length(sample_rate),
                config.waveguide_feedback,
                config.waveguide_damping,
            ),
            waveguide_mix: config.waveguide_mix,
            inv_modes,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let input = if input.is_finite() { input } else { 0.0 };
        let modal: f64 = self.modes.iter_mut().map(|m| m.process(input)).sum();
        let cavity = self.waveguide.process(input);
        modal * self.inv_modes + self.waveguide_mix * cavity
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn reset(&mut self) {
        self.modes.iter_mut().for_each(Biquad::reset);
        self.waveguide.reset();
    }
}

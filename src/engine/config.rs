#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::body::BodyConfig,
    error::{Error, Result},
    synth::{
        bellows::BellowsConfig,
        integrator::Integrator,
        voice::{ReedOutput, ReedParams},
    },
    MAX_BLOCK_SIZE,
};

/// Largest supported oversampling factor.
pub const MAX_OVERSAMPLE: usize = 16;

/// Everything fixed at engine construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate (Hz).
    pub sample_rate: f64,
    /// Output frames per `generate_block` call.
    pub block_size: usize,
    /// Internal rate multiplier for synthesis. 1 disables oversampling.
    pub oversample_factor: usize,
    /// Requested oversampler kernel length.
    pub oversampler_taps: usize,
    pub max_polyphony: usize,
    pub integrator: Integrator,
    pub output: ReedOutput,
    pub reed: ReedParams,
    pub bellows: BellowsConfig,
    pub body: BodyConfig,
    /// Body response at the output rate. `None` skips convolution.
    pub impulse_response: Option<Vec<f32>>,
    /// 1.0 is fully wet.
    pub convolution_mix: f32,
    /// Scale every block to unit peak.
    pub normalize: bool,
    /// Peaks below this are scaled as if they were this loud, so a decaying
    /// tail fades instead of being lifted back to full scale. 0 normalizes
    /// every block to unit peak.
    pub normalize_floor: f32,
    pub event_queue_capacity: usize,
    pub report_queue_capacity: usize,
    /// Seed for per-voice detune. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            oversample_factor: 2,
            oversampler_taps: 32,
            max_polyphony: 8,
            integrator: Integrator::default(),
            output: ReedOutput::default(),
            reed: ReedParams::default(),
            bellows: BellowsConfig::default(),
            body: BodyConfig::default(),
            impulse_response: None,
            convolution_mix: 1.0,
            normalize: true,
            normalize_floor: 0.0,
            event_queue_capacity: 256,
            report_queue_capacity: 256,
            seed: None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfig(msg.into())
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive and finite, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be non-negative and finite, got {value}")))
    }
}

impl EngineConfig {
    /// Rate the reeds, bellows and body run at.
    pub fn internal_rate(&self) -> f64 {
        self.sample_rate * self.oversample_factor as f64
    }

    /// Frames per block at the internal rate.
    pub fn internal_block(&self) -> usize {
        self.block_size * self.oversample_factor
    }

    /// Wall-clock deadline for one block.
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate)
    }

    /// Reject anything that would make the engine misbehave once running.
    pub fn validate(&self) -> Result<()> {
        positive("sample_rate", self.sample_rate)?;

        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(invalid(format!(
                "block_size must be in 1..={MAX_BLOCK_SIZE}, got {}",
                self.block_size
            )));
        }
        if !(1..=MAX_OVERSAMPLE).contains(&self.oversample_factor) {
            return Err(invalid(format!(
                "oversample_factor must be in 1..={MAX_OVERSAMPLE}, got {}",
                self.oversample_factor
            )));
        }
        if self.max_polyphony == 0 {
            return Err(invalid("max_polyphony must be at least 1"));
        }
        if self.event_queue_capacity == 0 || self.report_queue_capacity == 0 {
            return Err(invalid("queue capacities must be non-zero"));
        }

        let reed = &self.reed;
        positive("reed.mass", reed.mass)?;
        positive("reed.air_density", reed.air_density)?;
        positive("reed.slot_width", reed.slot_width)?;
        non_negative("reed.damping", reed.damping)?;
        non_negative("reed.collision_stiffness", reed.collision_stiffness)?;
        non_negative("reed.travel_limit", reed.travel_limit)?;
        non_negative("reed.airflow_coupling", reed.airflow_coupling)?;
        non_negative("reed.detune_cents", reed.detune_cents)?;
        if let ReedOutput::SoftClip { gain } = self.output {
            positive("output gain", gain)?;
        }

        positive("bellows.compliance", self.bellows.compliance)?;
        if !self.bellows.initial_pressure.is_finite() || !self.bellows.pump_rate.is_finite() {
            return Err(invalid("bellows pressure and pump rate must be finite"));
        }
        if let Some(relief) = self.bellows.relief_pressure {
            if !relief.is_finite() {
                return Err(invalid("bellows.relief_pressure must be finite"));
            }
        }

        let body = &self.body;
        if body.modes.is_empty() {
            return Err(invalid("body needs at least one resonant mode"));
        }
        let nyquist = self.internal_rate() / 2.0;
        for mode in &body.modes {
            if !(mode.frequency > 0.0 && mode.frequency < nyquist) {
                return Err(invalid(format!(
                    "body mode at {} Hz is outside (0, {nyquist})",
                    mode.frequency
                )));
            }
            positive("body mode q", mode.q)?;
        }
        positive("body.waveguide_delay", body.waveguide_delay)?;
        if !(0.0..1.0).contains(&body.waveguide_feedback) {
            return Err(invalid(format!(
                "body.waveguide_feedback must be in [0, 1), got {}",
                body.waveguide_feedback
            )));
        }
        if !(0.0..=1.0).contains(&body.waveguide_damping) {
            return Err(invalid("body.waveguide_damping must be in [0, 1]"));
        }
        non_negative("body.waveguide_mix", body.waveguide_mix)?;

        if !(self.normalize_floor.is_finite() && self.normalize_floor >= 0.0) {
            return Err(invalid(format!(
                "normalize_floor must be non-negative and finite, got {}",
                self.normalize_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.convolution_mix) {
            return Err(invalid(format!(
                "convolution_mix must be in [0, 1], got {}",
                self.convolution_mix
            )));
        }
        if let Some(ir) = &self.impulse_response {
            if ir.is_empty() {
                return Err(Error::EmptyImpulseResponse);
            }
            if ir.iter().any(|h| !h.is_finite()) {
                return Err(invalid("impulse response contains non-finite samples"));
            }
        }

        Ok(())
    }
}

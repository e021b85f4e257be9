//! Reed Voice - one free reed modeled as a driven mass-spring-damper.
//!
//! ```text
//!          bellows pressure P
//!                 │
//!                 ▼
//!   ┌───────────────────────────┐
//!   │  slot opening = max(w - x, 0)
//!   │  airflow U = opening · √(2|P|/ρ)
//!   │  F_air    = P · U · coupling          (Bernoulli drive)
//!   │  F_col    = -k_col · (x - x_max)²     (only when x > x_max)
//!   │  m·a      = F_air + F_col - c·v - k·x
//!   └───────────────────────────┘
//!                 │
//!                 ▼
//!       audio sample (v, or tanh(g·x))  +  airflow U drawn from the bellows
//! ```
//!
//! Stiffness is derived from the target frequency, `k = (2π f)² m`, after a
//! one-time random micro-detune drawn when the voice is created. Nothing else
//! in a voice is random, so a fixed event sequence and seed render the same
//! audio every time.

use std::f64::consts::TAU;

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::integrator::{Integrator, OscState, Solver};
use crate::synth::message::NoteId;

/// How the bellows pressure pushes on the reed tongue.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReedDrive {
    /// Force from airflow through the slot: `P · U · coupling`.
    /// Falls to zero once the slot is fully closed.
    Bernoulli,
    /// Force `P · (1 - beta · x)`, shrinking linearly as the reed moves in.
    Linear { beta: f64 },
}

/// Which state variable becomes the audio sample.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReedOutput {
    /// Reed velocity (proportional to the modulated airflow).
    #[default]
    Velocity,
    /// `tanh(gain · x)`.
    SoftClip { gain: f64 },
}

impl ReedOutput {
    pub const DEFAULT_CLIP_GAIN: f64 = 10.0;

    /// `tanh(10 · x)`.
    pub const fn soft_clip() -> Self {
        ReedOutput::SoftClip {
            gain: Self::DEFAULT_CLIP_GAIN,
        }
    }
}

/// Physical constants shared by every reed in an engine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReedParams {
    /// Tongue mass (kg).
    pub mass: f64,
    /// Viscous damping (N·s/m).
    pub damping: f64,
    /// Air density (kg/m³).
    pub air_density: f64,
    /// Slot width at rest (m).
    pub slot_width: f64,
    /// Displacement where the mechanical stop engages (m).
    pub travel_limit: f64,
    /// Stiffness of the quadratic stop penalty (N/m²).
    pub collision_stiffness: f64,
    /// Scales airflow into force for the Bernoulli drive.
    pub airflow_coupling: f64,
    /// Half-width of the uniform detune drawn per voice (cents).
    pub detune_cents: f64,
    pub drive: ReedDrive,
}

impl Default for ReedParams {
    fn default() -> Self {
        Self {
            mass: 0.002,
            damping: 0.001,
            air_density: 1.2,
            slot_width: 0.0005,
            travel_limit: 0.0006,
            collision_stiffness: 2e6,
            airflow_coupling: 1e-4,
            detune_cents: 2.0,
            drive: ReedDrive::Bernoulli,
        }
    }
}

/// Displacement beyond this many slot widths (or travel limits, whichever is
/// larger) counts as a runaway.
pub const RUNAWAY_SPAN: f64 = 10.0;

impl ReedParams {
    /// Largest plausible tongue excursion. A state past it is treated as
    /// diverged even while still finite.
    #[inline]
    pub fn runaway_limit(&self) -> f64 {
        RUNAWAY_SPAN * self.slot_width.max(self.travel_limit)
    }

    /// Airflow through the slot at displacement `x` and pressure `p`.
    #[inline]
    pub fn airflow(&self, x: f64, p: f64) -> f64 {
        let opening = (self.slot_width - x).max(0.0);
        if opening <= 0.0 {
            return 0.0;
        }
        opening * (2.0 * p.abs() / self.air_density).sqrt()
    }

    /// One-sided quadratic stop, zero until `x` passes the travel limit.
    #[inline]
    pub fn collision_force(&self, x: f64) -> f64 {
        if x > self.travel_limit {
            let excess = x - self.travel_limit;
            -self.collision_stiffness * excess * excess
        } else {
            0.0
        }
    }

    #[inline]
    pub fn drive_force(&self, x: f64, p: f64) -> f64 {
        match self.drive {
            ReedDrive::Bernoulli => p * self.airflow(x, p) * self.airflow_coupling,
            ReedDrive::Linear { beta } => p * (1.0 - beta * x),
        }
    }
}

/// The reed state became non-finite or left the runaway limit. The voice
/// must be retired before its output reaches the mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericDivergence {
    pub id: NoteId,
}

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReedSample {
    pub sample: f64,
    pub airflow: f64,
}

#[derive(Debug, Clone)]
pub struct ReedVoice {
    id: NoteId,
    /// Requested pitch before detune.
    frequency: f64,
    /// Detune drawn at creation (cents).
    detune_cents: f64,
    stiffness: f64,
    state: OscState,
    params: ReedParams,
}

impl ReedVoice {
    /// Create a voice, drawing its micro-detune from `rng`.
    pub fn new<R: Rng + ?Sized>(
        id: NoteId,
        frequency: f64,
        params: &ReedParams,
        rng: &mut R,
    ) -> Self {
        let cents = if params.detune_cents > 0.0 {
            rng.gen_range(-params.detune_cents..=params.detune_cents)
        } else {
            0.0
        };
        Self::with_detune(id, frequency, cents, params)
    }

    /// Create a voice with an explicit detune in cents.
    pub fn with_detune(id: NoteId, frequency: f64, detune_cents: f64, params: &ReedParams) -> Self {
        let tuned = frequency * 2f64.powf(detune_cents / 1200.0);
        let omega = TAU * tuned;

        Self {
            id,
            frequency,
            detune_cents,
            stiffness: omega * omega * params.mass,
            state: OscState::default(),
            params: *params,
        }
    }

    #[inline]
    fn acceleration(&self, x: f64, v: f64, pressure: f64) -> f64 {
        let p = &self.params;
        let force = p.drive_force(x, pressure) + p.collision_force(x)
            - p.damping * v
            - self.stiffness * x;
        force / p.mass
    }

    /// Advance by `dt` seconds under `pressure` with solver `S`.
    #[inline]
    pub fn step_with<S: Solver>(
        &mut self,
        dt: f64,
        pressure: f64,
        output: ReedOutput,
    ) -> Result<ReedSample, NumericDivergence> {
        let next = S::advance(self.state, dt, |x, v| self.acceleration(x, v, pressure));
        if !next.is_finite() || next.x.abs() > self.params.runaway_limit() {
            return Err(NumericDivergence { id: self.id });
        }

        let sample = match output {
            ReedOutput::Velocity => next.v,
            ReedOutput::SoftClip { gain } => (gain * next.x).tanh(),
        };
        let airflow = self.params.airflow(next.x, pressure);
        if !sample.is_finite() || !airflow.is_finite() {
            return Err(NumericDivergence { id: self.id });
        }
        self.state = next;

        Ok(ReedSample { sample, airflow })
    }

    /// Runtime-dispatched variant of [`step_with`](Self::step_with).
    pub fn step(
        &mut self,
        integrator: Integrator,
        dt: f64,
        pressure: f64,
        output: ReedOutput,
    ) -> Result<ReedSample, NumericDivergence> {
        use crate::synth::integrator::{Euler, Midpoint, RungeKutta4, SemiImplicitEuler};

        match integrator {
            Integrator::Euler => self.step_with::<Euler>(dt, pressure, output),
            Integrator::SemiImplicitEuler => self.step_with::<SemiImplicitEuler>(dt, pressure, output),
            Integrator::Midpoint => self.step_with::<Midpoint>(dt, pressure, output),
            Integrator::RungeKutta4 => self.step_with::<RungeKutta4>(dt, pressure, output),
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn detune_cents(&self) -> f64 {
        self.detune_cents
    }

    /// Natural frequency after detune, `√(k/m) / 2π`.
    pub fn tuned_frequency(&self) -> f64 {
        (self.stiffness / self.params.mass).sqrt() / TAU
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn state(&self) -> OscState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: OscState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Lossless linear reed: constant force, no damping, no stop.
    fn harmonic_params() -> ReedParams {
        ReedParams {
            damping: 0.0,
            collision_stiffness: 0.0,
            detune_cents: 0.0,
            drive: ReedDrive::Linear { beta: 0.0 },
            ..ReedParams::default()
        }
    }

    /// Worst displacement error over one period against the analytic
    /// solution x(t) = P/k · (1 - cos ωt).
    fn sho_error(integrator: Integrator, steps: usize) -> f64 {
        let params = harmonic_params();
        let frequency = 100.0;
        let pressure = 1.0;
        let mut voice = ReedVoice::with_detune(NoteId(1), frequency, 0.0, &params);

        let omega = TAU * frequency;
        let amplitude = pressure / voice.stiffness();
        let dt = 1.0 / (frequency * steps as f64);

        let mut worst = 0.0f64;
        for n in 1..=steps {
            voice
                .step(integrator, dt, pressure, ReedOutput::Velocity)
                .expect("lossless reed stays finite");
            let t = n as f64 * dt;
            let exact = amplitude * (1.0 - (omega * t).cos());
            worst = worst.max((voice.state().x - exact).abs() / amplitude);
        }
        worst
    }

    #[test]
    fn test_integrators_converge_to_harmonic_solution() {
        for integrator in Integrator::ALL {
            let coarse = sho_error(integrator, 500);
            let fine = sho_error(integrator, 1000);
            let finest = sho_error(integrator, 4000);
            let expected = 2f64.powi(integrator.order() as i32);

            assert!(finest < coarse, "{:?}: error must shrink as dt -> 0", integrator);
            let ratio = coarse / fine;
            assert!(
                ratio > expected * 0.75 && ratio < expected * 1.3,
                "{:?}: expected error ratio ~{}, got {} ({} vs {})",
                integrator,
                expected,
                ratio,
                coarse,
                fine
            );
        }
    }

    #[test]
    fn test_velocity_matches_analytic_solution() {
        let params = harmonic_params();
        let mut voice = ReedVoice::with_detune(NoteId(7), 200.0, 0.0, &params);
        let omega = TAU * 200.0;
        let dt = 1.0 / 192_000.0;

        let steps = 900;
        let last = (0..steps)
            .map(|_| {
                voice
                    .step(Integrator::RungeKutta4, dt, 2.0, ReedOutput::Velocity)
                    .unwrap()
                    .sample
            })
            .last()
            .unwrap();
        let t = steps as f64 * dt;
        let exact = 2.0 / (params.mass * omega) * (omega * t).sin();
        approx::assert_abs_diff_eq!(last, exact, epsilon = exact.abs() * 1e-6 + 1e-9);
    }

    #[test]
    fn test_detune_is_bounded_and_seeded() {
        let params = ReedParams::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        for i in 0..64 {
            let va = ReedVoice::new(NoteId(i), 261.63, &params, &mut a);
            let vb = ReedVoice::new(NoteId(i), 261.63, &params, &mut b);
            assert!(va.detune_cents().abs() <= 2.0);
            assert_eq!(va.detune_cents(), vb.detune_cents());
            assert_eq!(va.tuned_frequency(), vb.tuned_frequency());
        }
    }

    #[test]
    fn test_stiffness_tracks_frequency() {
        let params = ReedParams::default();
        let voice = ReedVoice::with_detune(NoteId(1), 440.0, 0.0, &params);
        approx::assert_abs_diff_eq!(voice.tuned_frequency(), 440.0, epsilon = 1e-9);

        let sharp = ReedVoice::with_detune(NoteId(1), 440.0, 1200.0, &params);
        approx::assert_abs_diff_eq!(sharp.tuned_frequency(), 880.0, epsilon = 1e-9);
    }

    #[test]
    fn test_airflow_stops_when_slot_closes() {
        let params = ReedParams::default();
        assert!(params.airflow(0.0, 600.0) > 0.0);
        assert_eq!(params.airflow(params.slot_width, 600.0), 0.0);
        assert_eq!(params.airflow(params.slot_width * 2.0, 600.0), 0.0);
        assert_eq!(params.drive_force(params.slot_width * 2.0, 600.0), 0.0);
    }

    #[test]
    fn test_collision_only_past_travel_limit() {
        let params = ReedParams::default();
        assert_eq!(params.collision_force(params.travel_limit), 0.0);
        assert_eq!(params.collision_force(-1.0), 0.0);

        let small = params.collision_force(params.travel_limit + 1e-5);
        let large = params.collision_force(params.travel_limit + 2e-5);
        assert!(small < 0.0);
        approx::assert_abs_diff_eq!(large / small, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_soft_clip_output_is_bounded() {
        let params = ReedParams::default();
        let mut voice = ReedVoice::with_detune(NoteId(1), 261.63, 0.0, &params);
        for _ in 0..4096 {
            let out = voice
                .step(
                    Integrator::Midpoint,
                    1.0 / 44_100.0,
                    600.0,
                    ReedOutput::soft_clip(),
                )
                .unwrap();
            assert!(out.sample.abs() <= 1.0);
            assert!(out.airflow >= 0.0);
        }
    }

    #[test]
    fn test_non_finite_state_is_reported() {
        let params = ReedParams::default();
        let mut voice = ReedVoice::with_detune(NoteId(9), 261.63, 0.0, &params);
        voice.set_state(OscState::new(f64::NAN, 0.0));

        let err = voice
            .step(Integrator::RungeKutta4, 1.0 / 44_100.0, 600.0, ReedOutput::Velocity)
            .unwrap_err();
        assert_eq!(err.id, NoteId(9));
    }

    #[test]
    fn test_runaway_is_reported_while_still_finite() {
        let params = ReedParams::default();
        let mut voice = ReedVoice::with_detune(NoteId(3), 261.63, 0.0, &params);
        let start = OscState::new(-params.runaway_limit() * 0.999, -50.0);
        voice.set_state(start);

        let err = voice
            .step(Integrator::Midpoint, 1.0 / 48_000.0, 600.0, ReedOutput::Velocity)
            .unwrap_err();
        assert_eq!(err.id, NoteId(3));
        assert_eq!(voice.state(), start, "a rejected step leaves the state alone");
    }

    #[test]
    fn test_explicit_euler_runaway_is_caught_early() {
        let params = ReedParams::default();
        let mut voice = ReedVoice::with_detune(NoteId(1), 261.63, 0.0, &params);
        let dt = 1.0 / 96_000.0;

        let mut peak_airflow = 0.0f64;
        let mut peak_sample = 0.0f64;
        let mut retired = false;
        for _ in 0..96_000 * 5 {
            match voice.step(Integrator::Euler, dt, 1000.0, ReedOutput::Velocity) {
                Ok(out) => {
                    peak_airflow = peak_airflow.max(out.airflow);
                    peak_sample = peak_sample.max(out.sample.abs());
                }
                Err(_) => {
                    retired = true;
                    break;
                }
            }
        }

        assert!(retired, "explicit Euler should run away on an undamped reed");
        // Everything it emitted stays within physical bounds
        assert!(peak_airflow <= params.airflow(-params.runaway_limit(), 1000.0));
        assert!(peak_sample < 1e3, "sample reached {}", peak_sample);
    }

    #[test]
    fn test_pressure_sets_oscillation() {
        let params = ReedParams::default();
        let mut voice = ReedVoice::with_detune(NoteId(1), 261.63, 0.0, &params);
        let mut peak = 0.0f64;
        for _ in 0..44_100 {
            let out = voice
                .step(Integrator::Midpoint, 1.0 / 44_100.0, 600.0, ReedOutput::Velocity)
                .unwrap();
            peak = peak.max(out.sample.abs());
        }
        assert!(peak > 0.0, "driven reed must move");
        assert!(voice.state().is_finite());
    }
}

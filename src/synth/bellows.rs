//! Bellows - the shared pressure reservoir every reed draws from.
//!
//! ```text
//! dP/dt = (pump_rate - total_airflow) / compliance
//! ```
//!
//! Integrated with explicit Euler at the same `dt` as the reeds. The reservoir
//! is a slow first-order lag next to audio-rate reed motion, so one Euler step
//! per sample is plenty.
//!
//! All active voices see the same pressure on a given sample and their summed
//! airflow pulls it down on the next. Holding a chord lowers the pressure
//! under every note of it. That coupling is intended.
//!
//! Pressure is not floored: a heavy draw may push it negative for a while.
//! An optional relief valve caps it from above so an idle reservoir does not
//! climb without bound. A non-finite draw is ignored and a step that would
//! leave the pressure non-finite keeps the previous value.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BellowsConfig {
    /// Pressure at construction (Pa).
    pub initial_pressure: f64,
    /// Airflow supplied by the pump per second.
    pub pump_rate: f64,
    /// Pneumatic compliance, must be positive.
    pub compliance: f64,
    /// Relief valve ceiling (Pa). `None` leaves pressure unbounded.
    pub relief_pressure: Option<f64>,
}

impl Default for BellowsConfig {
    fn default() -> Self {
        Self {
            initial_pressure: 600.0,
            pump_rate: 0.03,
            compliance: 1e-6,
            relief_pressure: Some(1000.0),
        }
    }
}

pub struct Bellows {
    pressure: f64,
    pump_rate: f64,
    compliance: f64,
    relief_pressure: Option<f64>,
    dt: f64,
}

impl Bellows {
    /// `dt` is the per-sample step at the rate the reeds run.
    pub fn new(config: &BellowsConfig, dt: f64) -> Self {
        Self {
            pressure: config.initial_pressure,
            pump_rate: config.pump_rate,
            compliance: config.compliance,
            relief_pressure: config.relief_pressure,
            dt,
        }
    }

    /// Advance one sample given the airflow drawn by every voice this sample.
    #[inline]
    pub fn step(&mut self, total_airflow: f64) -> f64 {
        let draw = if total_airflow.is_finite() { total_airflow } else { 0.0 };
        let dp = (self.pump_rate - draw) / self.compliance;
        let mut next = self.pressure + dp * self.dt;

        if let Some(ceiling) = self.relief_pressure {
            next = next.min(ceiling);
        }
        if next.is_finite() {
            self.pressure = next;
        }

        self.pressure
    }

    #[inline]
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn pump_rate(&self) -> f64 {
        self.pump_rate
    }

    /// Takes effect from the next sample.
    pub fn set_pump_rate(&mut self, rate: f64) {
        self.pump_rate = rate;
    }

    pub fn compliance(&self) -> f64 {
        self.compliance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_valve() -> BellowsConfig {
        BellowsConfig {
            relief_pressure: None,
            ..BellowsConfig::default()
        }
    }

    #[test]
    fn test_balanced_flow_holds_pressure() {
        let config = open_valve();
        let mut bellows = Bellows::new(&config, 1.0 / 48_000.0);
        for _ in 0..1000 {
            bellows.step(config.pump_rate);
        }
        approx::assert_abs_diff_eq!(bellows.pressure(), config.initial_pressure, epsilon = 1e-6);
    }

    #[test]
    fn test_euler_update_matches_formula() {
        let config = open_valve();
        let dt = 1.0 / 44_100.0;
        let mut bellows = Bellows::new(&config, dt);

        let p = bellows.step(0.01);
        let expected = config.initial_pressure + (config.pump_rate - 0.01) / config.compliance * dt;
        approx::assert_abs_diff_eq!(p, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_heavy_draw_lowers_pressure() {
        let mut bellows = Bellows::new(&BellowsConfig::default(), 1.0 / 48_000.0);
        let start = bellows.pressure();
        for _ in 0..100 {
            bellows.step(0.1);
        }
        assert!(bellows.pressure() < start);
    }

    #[test]
    fn test_pressure_may_go_negative() {
        let mut bellows = Bellows::new(&BellowsConfig::default(), 1.0 / 48_000.0);
        for _ in 0..48_000 {
            bellows.step(1.0);
        }
        assert!(bellows.pressure() < 0.0, "no floor is applied");
        assert!(bellows.pressure().is_finite());
    }

    #[test]
    fn test_relief_valve_caps_idle_pressure() {
        let config = BellowsConfig::default();
        let mut bellows = Bellows::new(&config, 1.0 / 48_000.0);
        for _ in 0..48_000 {
            bellows.step(0.0);
        }
        approx::assert_abs_diff_eq!(bellows.pressure(), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_draw_leaves_pressure_finite() {
        let config = open_valve();
        let mut bellows = Bellows::new(&config, 1.0 / 48_000.0);
        for draw in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(bellows.step(draw).is_finite(), "{} poisoned the reservoir", draw);
        }

        // An overflowing draw keeps the last good value
        let before = bellows.pressure();
        bellows.step(f64::MAX);
        approx::assert_abs_diff_eq!(bellows.pressure(), before, epsilon = 1e-12);
    }

    #[test]
    fn test_pump_rate_change_applies_next_step() {
        let config = open_valve();
        let mut bellows = Bellows::new(&config, 1.0 / 48_000.0);
        bellows.set_pump_rate(0.0);
        let before = bellows.pressure();
        bellows.step(0.0);
        approx::assert_abs_diff_eq!(bellows.pressure(), before, epsilon = 1e-12);
    }
}

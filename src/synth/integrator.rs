//! ODE integration strategies for the reed oscillator.
//!
//! Every strategy advances the same second-order system
//!
//! ```text
//! dx/dt = v
//! dv/dt = a(x, v)
//! ```
//!
//! where `a` is supplied by the caller. The reed voice owns the physics, the
//! solver owns only the stepping scheme, so all four schemes share one
//! acceleration function.
//!
//! | scheme              | order | notes                                         |
//! | ------------------- | ----- | --------------------------------------------- |
//! | explicit Euler      | 1     | gains energy on oscillators, diverges         |
//! | semi-implicit Euler | 1     | symplectic, bounded energy error              |
//! | midpoint (RK2)      | 2     | two acceleration evaluations per step         |
//! | RK4                 | 4     | four evaluations, the accurate reference      |
//!
//! The engine resolves the [`Integrator`] tag once per block and runs the
//! per-sample loop monomorphized over the matching [`Solver`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and velocity of a single-degree-of-freedom oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OscState {
    pub x: f64,
    pub v: f64,
}

impl OscState {
    pub fn new(x: f64, v: f64) -> Self {
        Self { x, v }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.v.is_finite()
    }
}

/// A fixed-step scheme over a shared acceleration function.
pub trait Solver {
    fn advance<A>(state: OscState, dt: f64, accel: A) -> OscState
    where
        A: Fn(f64, f64) -> f64;
}

/// Explicit (forward) Euler: position and velocity both use the old state.
pub struct Euler;

/// Semi-implicit Euler: velocity first, then position from the new velocity.
pub struct SemiImplicitEuler;

/// Second-order Runge-Kutta, midpoint form.
pub struct Midpoint;

/// Classic fourth-order Runge-Kutta.
pub struct RungeKutta4;

impl Solver for Euler {
    #[inline]
    fn advance<A>(s: OscState, dt: f64, accel: A) -> OscState
    where
        A: Fn(f64, f64) -> f64,
    {
        let a = accel(s.x, s.v);
        OscState {
            x: s.x + s.v * dt,
            v: s.v + a * dt,
        }
    }
}

impl Solver for SemiImplicitEuler {
    #[inline]
    fn advance<A>(s: OscState, dt: f64, accel: A) -> OscState
    where
        A: Fn(f64, f64) -> f64,
    {
        let v = s.v + accel(s.x, s.v) * dt;
        OscState { x: s.x + v * dt, v }
    }
}

impl Solver for Midpoint {
    #[inline]
    fn advance<A>(s: OscState, dt: f64, accel: A) -> OscState
    where
        A: Fn(f64, f64) -> f64,
    {
        let half = 0.5 * dt;
        let a1 = accel(s.x, s.v);
        let x_mid = s.x + s.v * half;
        let v_mid = s.v + a1 * half;
        let a2 = accel(x_mid, v_mid);
        OscState {
            x: s.x + v_mid * dt,
            v: s.v + a2 * dt,
        }
    }
}

impl Solver for RungeKutta4 {
    #[inline]
    fn advance<A>(s: OscState, dt: f64, accel: A) -> OscState
    where
        A: Fn(f64, f64) -> f64,
    {
        let half = 0.5 * dt;

        let k1x = s.v;
        let k1v = accel(s.x, s.v);

        let k2x = s.v + k1v * half;
        let k2v = accel(s.x + k1x * half, k2x);

        let k3x = s.v + k2v * half;
        let k3v = accel(s.x + k2x * half, k3x);

        let k4x = s.v + k3v * dt;
        let k4v = accel(s.x + k3x * dt, k4x);

        OscState {
            x: s.x + dt * (k1x + 2.0 * k2x + 2.0 * k3x + k4x) / 6.0,
            v: s.v + dt * (k1v + 2.0 * k2v + 2.0 * k3v + k4v) / 6.0,
        }
    }
}

/// Integration scheme chosen once at engine construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integrator {
    Euler,
    SemiImplicitEuler,
    #[default]
    Midpoint,
    RungeKutta4,
}

impl Integrator {
    pub const ALL: [Integrator; 4] = [
        Integrator::Euler,
        Integrator::SemiImplicitEuler,
        Integrator::Midpoint,
        Integrator::RungeKutta4,
    ];

    /// Convergence order of the scheme.
    pub fn order(self) -> u32 {
        match self {
            Integrator::Euler | Integrator::SemiImplicitEuler => 1,
            Integrator::Midpoint => 2,
            Integrator::RungeKutta4 => 4,
        }
    }

    /// Advance one step with the scheme this tag names.
    ///
    /// Convenience for one-off stepping; hot loops should dispatch once and
    /// call [`Solver::advance`] directly.
    pub fn advance<A>(self, state: OscState, dt: f64, accel: A) -> OscState
    where
        A: Fn(f64, f64) -> f64,
    {
        match self {
            Integrator::Euler => Euler::advance(state, dt, accel),
            Integrator::SemiImplicitEuler => SemiImplicitEuler::advance(state, dt, accel),
            Integrator::Midpoint => Midpoint::advance(state, dt, accel),
            Integrator::RungeKutta4 => RungeKutta4::advance(state, dt, accel),
        }
    }
}

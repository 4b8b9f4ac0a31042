//! Canned validation problems and their fixed-layout result arrays.
//!
//! Each benchmark is a plain configuration struct; the defaults reproduce the
//! layouts external consumers slice by fixed row offsets, so group order and
//! group length are part of the contract.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::driver::{
    run, solve_ode_cn, solve_ode_ee, solve_ode_ie, Scheme, State, StepCallback,
};
use crate::prelude::*;
use crate::system::{Projector, SecondOrderSystem, VectorField};

//------------------------------------------------------------------------------
// Systems
//------------------------------------------------------------------------------

/// Linear oscillator `ddx = -(k/m) x - (c/m) dx` on `n` independent axes.
pub struct MassSpring {
    n: usize,
    stiffness: f64,
    mass: f64,
    damping: f64,
}

impl MassSpring {
    pub fn new(n: usize, stiffness: f64, mass: f64) -> Self {
        MassSpring {
            n,
            stiffness,
            mass,
            damping: 0.,
        }
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }
}

impl SecondOrderSystem for MassSpring {
    fn dim(&self) -> usize {
        self.n
    }

    fn force(&self, _t: f64, x: &VectorD, dx: &VectorD, f: &mut VectorD) {
        for (fi, &xi, &vi) in izip!(f.iter_mut(), x.iter(), dx.iter()) {
            *fi = -(self.stiffness / self.mass) * xi - (self.damping / self.mass) * vi;
        }
    }

    fn force_jacobian_x(&self, _t: f64, _x: &VectorD, _dx: &VectorD, jac: &mut MatrixD) {
        jac.fill(0.);
        for i in 0..self.n {
            jac[(i, i)] = -self.stiffness / self.mass;
        }
    }

    fn force_jacobian_dx(&self, _t: f64, _x: &VectorD, _dx: &VectorD, jac: &mut MatrixD) {
        jac.fill(0.);
        for i in 0..self.n {
            jac[(i, i)] = -self.damping / self.mass;
        }
    }
}

/// Scalar growth/decay `dy/dt = lambda y`.
pub struct Exponential {
    lambda: f64,
}

impl Exponential {
    pub fn new(lambda: f64) -> Self {
        Exponential { lambda }
    }
}

impl VectorField for Exponential {
    fn dim(&self) -> usize {
        1
    }

    fn eval(&self, _t: f64, y: &VectorD, f: &mut VectorD) {
        f[0] = self.lambda * y[0];
    }

    fn jacobian(&self, _t: f64, _y: &VectorD, jac: &mut MatrixD) {
        jac[(0, 0)] = self.lambda;
    }
}

/// Pendulum of unit length and mass under unit gravity, written as a DAE:
/// state `(x, y, lambda)` with the length constraint `x^2 + y^2 = 1` carried
/// in the last residual row.
pub struct ConstrainedPendulum;

impl ConstrainedPendulum {
    /// Projector matching this system's layout: two momentum-carrying
    /// coordinates, one multiplier.
    pub fn projector() -> Projector {
        Projector::new(3, 0, 2).expect("static range is valid")
    }
}

impl SecondOrderSystem for ConstrainedPendulum {
    fn dim(&self) -> usize {
        3
    }

    fn force(&self, _t: f64, x: &VectorD, _dx: &VectorD, f: &mut VectorD) {
        f[0] = 2. * x[0] * x[2];
        f[1] = 2. * x[1] * x[2] - 1.;
        f[2] = x[0] * x[0] + x[1] * x[1] - 1.;
    }

    fn force_jacobian_x(&self, _t: f64, x: &VectorD, _dx: &VectorD, jac: &mut MatrixD) {
        jac[(0, 0)] = 2. * x[2];
        jac[(0, 1)] = 0.;
        jac[(0, 2)] = 2. * x[0];

        jac[(1, 0)] = 0.;
        jac[(1, 1)] = 2. * x[2];
        jac[(1, 2)] = 2. * x[1];

        jac[(2, 0)] = 2. * x[0];
        jac[(2, 1)] = 2. * x[1];
        jac[(2, 2)] = 0.;
    }
}

//------------------------------------------------------------------------------
// Benchmark configurations
//------------------------------------------------------------------------------

/// Unit oscillator compared across the three classic schemes.
///
/// Result layout: `3 * group_rows` rows of `(x, dx)`: explicit Euler rows,
/// then implicit Euler rows, then Crank-Nicolson rows; row 0 of each group is
/// the initial state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassSpringBenchmark {
    pub stiffness: f64,
    pub mass: f64,
    pub t_end: f64,
    pub steps: usize,
    pub group_rows: usize,
}

impl Default for MassSpringBenchmark {
    fn default() -> Self {
        MassSpringBenchmark {
            stiffness: 1.,
            mass: 1.,
            t_end: 4. * PI,
            steps: 100,
            group_rows: 100,
        }
    }
}

impl MassSpringBenchmark {
    pub fn run(&self) -> Result<MatrixD, Error> {
        let system = MassSpring::new(1, self.stiffness, self.mass);
        let state0 = State::from_parts(
            VectorD::from_vec(vec![1.]),
            VectorD::zeros(1),
            VectorD::from_vec(vec![-self.stiffness / self.mass]),
        )?;

        let schemes = [
            Scheme::ExplicitEuler,
            Scheme::ImplicitEuler,
            Scheme::CrankNicolson,
        ];
        let mut all = MatrixD::zeros(schemes.len() * self.group_rows, 2);
        for (g, &scheme) in schemes.iter().enumerate() {
            let trajectory = run(scheme, &system, None, &state0, self.t_end, self.steps)?;
            all.view_mut((g * self.group_rows, 0), (self.group_rows, 2))
                .copy_from(&trajectory.stacked_xdx(self.group_rows)?);
        }
        Ok(all)
    }
}

/// `dy/dt = lambda y` compared across the three classic schemes.
///
/// Result layout: `3 * group_rows` rows of one column, grouped like
/// [`MassSpringBenchmark`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExponentialBenchmark {
    pub lambda: f64,
    pub y0: f64,
    pub t_end: f64,
    pub steps: usize,
    pub group_rows: usize,
}

impl Default for ExponentialBenchmark {
    fn default() -> Self {
        ExponentialBenchmark {
            lambda: -1.,
            y0: 1.,
            t_end: 1.,
            steps: 100,
            group_rows: 100,
        }
    }
}

impl ExponentialBenchmark {
    pub fn run(&self) -> Result<MatrixD, Error> {
        type Solve = fn(
            f64,
            usize,
            &mut VectorD,
            &dyn VectorField,
            Option<StepCallback<'_>>,
        ) -> Result<(), Error>;
        let solvers: [Solve; 3] = [solve_ode_ee, solve_ode_ie, solve_ode_cn];

        let system = Exponential::new(self.lambda);
        let mut all = MatrixD::zeros(solvers.len() * self.group_rows, 1);
        for (g, solve) in solvers.iter().enumerate() {
            let mut y = VectorD::from_vec(vec![self.y0]);
            let mut samples = vec![self.y0];
            let mut record = |_t: f64, y: &VectorD| samples.push(y[0]);
            solve(self.t_end, self.steps, &mut y, &system, Some(&mut record))?;

            if samples.len() < self.group_rows {
                return Err(Error::DimensionMismatch {
                    op: "stacked rows",
                    expected: self.group_rows,
                    found: samples.len(),
                });
            }
            for (i, &v) in samples.iter().take(self.group_rows).enumerate() {
                all[(g * self.group_rows + i, 0)] = v;
            }
        }
        Ok(all)
    }
}

/// Constrained pendulum under generalized-alpha.
///
/// Result layout: `group_rows` position rows `(x, y, lambda)`, row 0 the
/// initial state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphaBenchmark {
    pub rho_inf: f64,
    pub t_end: f64,
    pub steps: usize,
    pub group_rows: usize,
}

impl Default for AlphaBenchmark {
    fn default() -> Self {
        AlphaBenchmark {
            rho_inf: 0.8,
            t_end: 4. * PI,
            steps: 100,
            group_rows: 100,
        }
    }
}

impl AlphaBenchmark {
    pub fn run(&self) -> Result<MatrixD, Error> {
        let system = ConstrainedPendulum;
        let projector = ConstrainedPendulum::projector();
        let state0 = State::from_parts(
            VectorD::from_vec(vec![1., 0., 0.]),
            VectorD::zeros(3),
            VectorD::zeros(3),
        )?;
        let trajectory = run(
            Scheme::GeneralizedAlpha {
                rho_inf: self.rho_inf,
            },
            &system,
            Some(&projector),
            &state0,
            self.t_end,
            self.steps,
        )?;
        trajectory.stacked_x(self.group_rows)
    }
}

//------------------------------------------------------------------------------
// Invocation surface
//------------------------------------------------------------------------------

pub fn test_mass_spring() -> Result<MatrixD, Error> {
    MassSpringBenchmark::default().run()
}

pub fn test_exponential() -> Result<MatrixD, Error> {
    ExponentialBenchmark::default().run()
}

pub fn test_alpha() -> Result<MatrixD, Error> {
    AlphaBenchmark::default().run()
}

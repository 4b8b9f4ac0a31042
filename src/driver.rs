//! Integration driver: owns the trajectory buffers, dispatches schemes, and
//! exposes the fixed-parameter-order solve functions used by external
//! harnesses.

use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::solver::alpha::{AlphaParams, GeneralizedAlphaSolver};
use crate::solver::first_order::{CrankNicolson, ExplicitEuler, ImplicitEuler, OdeStepper};
use crate::system::{FirstOrderForm, IdentityMass, MassOperator, SecondOrderSystem, VectorField};

//------------------------------------------------------------------------------
// Schemes
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scheme {
    ExplicitEuler,
    ImplicitEuler,
    CrankNicolson,
    GeneralizedAlpha { rho_inf: f64 },
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::ExplicitEuler => "explicit Euler",
            Scheme::ImplicitEuler => "implicit Euler",
            Scheme::CrankNicolson => "Crank-Nicolson",
            Scheme::GeneralizedAlpha { .. } => "generalized alpha",
        }
    }
}

//------------------------------------------------------------------------------
// State and trajectory
//------------------------------------------------------------------------------

/// Position, velocity, and acceleration of one time level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub x: VectorD,
    pub dx: VectorD,
    pub ddx: VectorD,
}

impl State {
    pub fn new(n: usize) -> Self {
        State {
            x: VectorD::zeros(n),
            dx: VectorD::zeros(n),
            ddx: VectorD::zeros(n),
        }
    }

    pub fn from_parts(x: VectorD, dx: VectorD, ddx: VectorD) -> Result<Self, Error> {
        if dx.len() != x.len() || ddx.len() != x.len() {
            return Err(Error::DimensionMismatch {
                op: "state",
                expected: x.len(),
                found: dx.len().max(ddx.len()),
            });
        }
        Ok(State { x, dx, ddx })
    }

    pub fn dim(&self) -> usize {
        self.x.len()
    }
}

/// Snapshots of one integration run, initial state included.
///
/// Owned exclusively by the run that produced it; immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    t: Vec<f64>,
    states: Vec<State>,
}

impl Trajectory {
    fn with_capacity(samples: usize) -> Self {
        Trajectory {
            t: Vec::with_capacity(samples),
            states: Vec::with_capacity(samples),
        }
    }

    fn push(&mut self, t: f64, state: State) {
        self.t.push(t);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.t
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, i: usize) -> &State {
        &self.states[i]
    }

    pub fn last(&self) -> &State {
        self.states.last().expect("trajectory is never empty")
    }

    /// First `rows` samples stacked as `(x, dx)` rows of width `2n`.
    pub fn stacked_xdx(&self, rows: usize) -> Result<MatrixD, Error> {
        self.stack(rows, |s| s.x.iter().chain(s.dx.iter()).copied().collect_vec())
    }

    /// First `rows` samples stacked as position rows of width `n`.
    pub fn stacked_x(&self, rows: usize) -> Result<MatrixD, Error> {
        self.stack(rows, |s| s.x.iter().copied().collect_vec())
    }

    fn stack(&self, rows: usize, make_row: impl Fn(&State) -> Vec<f64>) -> Result<MatrixD, Error> {
        if rows > self.len() {
            return Err(Error::DimensionMismatch {
                op: "stacked rows",
                expected: rows,
                found: self.len(),
            });
        }
        let width = if rows == 0 {
            0
        } else {
            make_row(&self.states[0]).len()
        };
        let mut out = MatrixD::zeros(rows, width);
        for (i, state) in self.states.iter().take(rows).enumerate() {
            for (j, v) in make_row(state).into_iter().enumerate() {
                out[(i, j)] = v;
            }
        }
        Ok(out)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

//------------------------------------------------------------------------------
// Driver
//------------------------------------------------------------------------------

fn step_size(t_end: f64, steps: usize) -> Result<f64, Error> {
    let dt = t_end / steps as f64;
    if dt > 0. && dt.is_finite() {
        Ok(dt)
    } else {
        Err(Error::InvalidParameter {
            name: "t_end",
            value: t_end,
        })
    }
}

/// Integrates `system` from `t = 0` to `t_end` in `steps` fixed steps.
///
/// Any failure during a step aborts the run; no partial trajectory is ever
/// returned. `steps == 0` yields the initial snapshot alone.
pub fn run(
    scheme: Scheme,
    system: &dyn SecondOrderSystem,
    mass: Option<&dyn MassOperator>,
    state0: &State,
    t_end: f64,
    steps: usize,
) -> Result<Trajectory, Error> {
    let n = system.dim();
    if state0.dim() != n {
        return Err(Error::DimensionMismatch {
            op: "initial state",
            expected: n,
            found: state0.dim(),
        });
    }
    if let Some(m) = mass {
        if m.dim() != n {
            return Err(Error::DimensionMismatch {
                op: "mass operator",
                expected: n,
                found: m.dim(),
            });
        }
    }

    let mut trajectory = Trajectory::with_capacity(steps + 1);
    trajectory.push(0., state0.clone());
    if steps == 0 {
        return Ok(trajectory);
    }
    let dt = step_size(t_end, steps)?;
    tracing::debug!(scheme = scheme.name(), steps, t_end, "integrating");

    match scheme {
        Scheme::GeneralizedAlpha { rho_inf } => {
            let fallback;
            let mass_op: &dyn MassOperator = match mass {
                Some(m) => m,
                None => {
                    fallback = IdentityMass::new(n);
                    &fallback
                }
            };
            let params = AlphaParams::from_spectral_radius(rho_inf)?;
            let solver = GeneralizedAlphaSolver::new(params, dt)?;

            let mut x = state0.x.clone();
            let mut dx = state0.dx.clone();
            let mut ddx = state0.ddx.clone();
            for i in 0..steps {
                let t = i as f64 * dt;
                solver
                    .step(system, mass_op, t, &mut x, &mut dx, &mut ddx)
                    .map_err(|e| e.at_step(scheme.name(), i))?;
                trajectory.push(
                    (i + 1) as f64 * dt,
                    State {
                        x: x.clone(),
                        dx: dx.clone(),
                        ddx: ddx.clone(),
                    },
                );
            }
        }
        _ => {
            let form = FirstOrderForm::new(system);
            let mut stepper: Box<dyn OdeStepper> = match scheme {
                Scheme::ExplicitEuler => Box::new(ExplicitEuler::new(dt, 2 * n)?),
                Scheme::ImplicitEuler => Box::new(ImplicitEuler::new(dt)?),
                Scheme::CrankNicolson => Box::new(CrankNicolson::new(dt)?),
                Scheme::GeneralizedAlpha { .. } => unreachable!(),
            };

            let mut y = VectorD::zeros(2 * n);
            y.rows_mut(0, n).copy_from(&state0.x);
            y.rows_mut(n, n).copy_from(&state0.dx);

            for i in 0..steps {
                let t = i as f64 * dt;
                stepper
                    .step(&form, t, &mut y)
                    .map_err(|e| e.at_step(scheme.name(), i))?;
                trajectory.push((i + 1) as f64 * dt, sample(system, (i + 1) as f64 * dt, &y));
            }
        }
    }

    Ok(trajectory)
}

/// Rebuilds a full state snapshot from the first-order form, with the
/// acceleration re-evaluated from the force functor.
fn sample(system: &dyn SecondOrderSystem, t: f64, y: &VectorD) -> State {
    let n = system.dim();
    let x = y.rows(0, n).into_owned();
    let dx = y.rows(n, n).into_owned();
    let mut ddx = VectorD::zeros(n);
    system.force(t, &x, &dx, &mut ddx);
    State { x, dx, ddx }
}

//------------------------------------------------------------------------------
// Fixed-order solve surface
//------------------------------------------------------------------------------

/// Step callback invoked after every accepted step.
pub type StepCallback<'a> = &'a mut dyn FnMut(f64, &VectorD);

fn solve_first_order(
    stepper: &mut dyn OdeStepper,
    scheme: &'static str,
    t_end: f64,
    steps: usize,
    y: &mut VectorD,
    rhs: &dyn VectorField,
    mut callback: Option<StepCallback<'_>>,
) -> Result<(), Error> {
    if steps == 0 {
        return Ok(());
    }
    let dt = step_size(t_end, steps)?;
    for i in 0..steps {
        let t = i as f64 * dt;
        stepper
            .step(rhs, t, y)
            .map_err(|e| e.at_step(scheme, i))?;
        if let Some(cb) = callback.as_mut() {
            cb((i + 1) as f64 * dt, y);
        }
    }
    Ok(())
}

/// Explicit Euler over `[0, t_end]`, advancing `y` in place.
pub fn solve_ode_ee(
    t_end: f64,
    steps: usize,
    y: &mut VectorD,
    rhs: &dyn VectorField,
    callback: Option<StepCallback<'_>>,
) -> Result<(), Error> {
    if steps == 0 {
        return Ok(());
    }
    let mut stepper = ExplicitEuler::new(step_size(t_end, steps)?, y.len())?;
    solve_first_order(&mut stepper, "explicit Euler", t_end, steps, y, rhs, callback)
}

/// Implicit Euler over `[0, t_end]`, advancing `y` in place.
pub fn solve_ode_ie(
    t_end: f64,
    steps: usize,
    y: &mut VectorD,
    rhs: &dyn VectorField,
    callback: Option<StepCallback<'_>>,
) -> Result<(), Error> {
    if steps == 0 {
        return Ok(());
    }
    let mut stepper = ImplicitEuler::new(step_size(t_end, steps)?)?;
    solve_first_order(&mut stepper, "implicit Euler", t_end, steps, y, rhs, callback)
}

/// Crank-Nicolson over `[0, t_end]`, advancing `y` in place.
pub fn solve_ode_cn(
    t_end: f64,
    steps: usize,
    y: &mut VectorD,
    rhs: &dyn VectorField,
    callback: Option<StepCallback<'_>>,
) -> Result<(), Error> {
    if steps == 0 {
        return Ok(());
    }
    let mut stepper = CrankNicolson::new(step_size(t_end, steps)?)?;
    solve_first_order(&mut stepper, "Crank-Nicolson", t_end, steps, y, rhs, callback)
}

/// Generalized-alpha over `[0, t_end]`, advancing `(x, dx, ddx)` in place.
///
/// `rho_inf` is the spectral radius at infinity, in `(0, 1]`.
#[allow(clippy::too_many_arguments)]
pub fn solve_ode_alpha(
    t_end: f64,
    steps: usize,
    rho_inf: f64,
    x: &mut VectorD,
    dx: &mut VectorD,
    ddx: &mut VectorD,
    rhs: &dyn SecondOrderSystem,
    mass: &dyn MassOperator,
    mut callback: Option<StepCallback<'_>>,
) -> Result<(), Error> {
    if steps == 0 {
        return Ok(());
    }
    let dt = step_size(t_end, steps)?;
    let params = AlphaParams::from_spectral_radius(rho_inf)?;
    let solver = GeneralizedAlphaSolver::new(params, dt)?;
    for i in 0..steps {
        let t = i as f64 * dt;
        solver
            .step(rhs, mass, t, x, dx, ddx)
            .map_err(|e| e.at_step("generalized alpha", i))?;
        if let Some(cb) = callback.as_mut() {
            cb((i + 1) as f64 * dt, x);
        }
    }
    Ok(())
}

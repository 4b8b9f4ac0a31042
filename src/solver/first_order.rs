//! One-step schemes for `dy/dt = f(t, y)`.
//!
//! Each stepper owns its step size and scratch space; the implicit schemes
//! assemble a per-step residual and hand it to the Newton iteration.

use crate::newton::{NewtonSolver, Residual};
use crate::prelude::*;
use crate::system::VectorField;

/// Advances `y` from `t` to `t + dt` in place.
pub trait OdeStepper {
    fn step(&mut self, rhs: &dyn VectorField, t: f64, y: &mut VectorD) -> Result<(), Error>;
}

fn check_dt(dt: f64) -> Result<f64, Error> {
    if dt > 0. && dt.is_finite() {
        Ok(dt)
    } else {
        Err(Error::InvalidParameter {
            name: "dt",
            value: dt,
        })
    }
}

fn check_dim(op: &'static str, rhs: &dyn VectorField, y: &VectorD) -> Result<usize, Error> {
    if rhs.dim() == y.len() {
        Ok(y.len())
    } else {
        Err(Error::DimensionMismatch {
            op,
            expected: rhs.dim(),
            found: y.len(),
        })
    }
}

//------------------------------------------------------------------------------
// Explicit Euler
//------------------------------------------------------------------------------

/// `y' = y + dt f(t, y)`. No solve; conditionally stable.
pub struct ExplicitEuler {
    dt: f64,
    work: VectorD,
}

impl ExplicitEuler {
    pub fn new(dt: f64, dim: usize) -> Result<Self, Error> {
        Ok(Self {
            dt: check_dt(dt)?,
            work: VectorD::zeros(dim),
        })
    }
}

impl OdeStepper for ExplicitEuler {
    fn step(&mut self, rhs: &dyn VectorField, t: f64, y: &mut VectorD) -> Result<(), Error> {
        let n = check_dim("explicit Euler step", rhs, y)?;
        if n != self.work.len() {
            return Err(Error::DimensionMismatch {
                op: "explicit Euler step",
                expected: self.work.len(),
                found: n,
            });
        }
        rhs.eval(t, y, &mut self.work);
        y.axpy(self.dt, &self.work, 1.);
        Ok(())
    }
}

//------------------------------------------------------------------------------
// Implicit Euler
//------------------------------------------------------------------------------

/// `r(u) = u - y - dt f(t + dt, u)`
struct BackwardResidual<'a> {
    rhs: &'a dyn VectorField,
    y_old: &'a VectorD,
    t_next: f64,
    dt: f64,
}

impl Residual for BackwardResidual<'_> {
    fn dim(&self) -> usize {
        self.y_old.len()
    }

    fn eval(&self, u: &VectorD, r: &mut VectorD) {
        let mut f = VectorD::zeros(u.len());
        self.rhs.eval(self.t_next, u, &mut f);
        r.copy_from(u);
        *r -= self.y_old;
        r.axpy(-self.dt, &f, 1.);
    }

    fn jacobian(&self, u: &VectorD, jac: &mut MatrixD) {
        self.rhs.jacobian(self.t_next, u, jac);
        *jac *= -self.dt;
        for i in 0..u.len() {
            jac[(i, i)] += 1.;
        }
    }
}

/// Solves `y' = y + dt f(t + dt, y')` each step. Unconditionally stable,
/// strongly damping.
pub struct ImplicitEuler {
    dt: f64,
    pub newton: NewtonSolver,
}

impl ImplicitEuler {
    pub fn new(dt: f64) -> Result<Self, Error> {
        Ok(Self {
            dt: check_dt(dt)?,
            newton: NewtonSolver::default(),
        })
    }
}

impl OdeStepper for ImplicitEuler {
    fn step(&mut self, rhs: &dyn VectorField, t: f64, y: &mut VectorD) -> Result<(), Error> {
        check_dim("implicit Euler step", rhs, y)?;
        let y_old = y.clone();
        let equ = BackwardResidual {
            rhs,
            y_old: &y_old,
            t_next: t + self.dt,
            dt: self.dt,
        };
        self.newton.solve(&equ, y)?;
        Ok(())
    }
}

//------------------------------------------------------------------------------
// Crank-Nicolson
//------------------------------------------------------------------------------

/// `r(u) = u - y - dt/2 (f(t, y) + f(t + dt, u))`
struct TrapezoidalResidual<'a> {
    rhs: &'a dyn VectorField,
    y_old: &'a VectorD,
    f_old: &'a VectorD,
    t_next: f64,
    dt: f64,
}

impl Residual for TrapezoidalResidual<'_> {
    fn dim(&self) -> usize {
        self.y_old.len()
    }

    fn eval(&self, u: &VectorD, r: &mut VectorD) {
        let mut f = VectorD::zeros(u.len());
        self.rhs.eval(self.t_next, u, &mut f);
        r.copy_from(u);
        *r -= self.y_old;
        r.axpy(-0.5 * self.dt, self.f_old, 1.);
        r.axpy(-0.5 * self.dt, &f, 1.);
    }

    fn jacobian(&self, u: &VectorD, jac: &mut MatrixD) {
        self.rhs.jacobian(self.t_next, u, jac);
        *jac *= -0.5 * self.dt;
        for i in 0..u.len() {
            jac[(i, i)] += 1.;
        }
    }
}

/// Trapezoidal average of the explicit and implicit right-hand sides;
/// second order, amplitude preserving.
pub struct CrankNicolson {
    dt: f64,
    pub newton: NewtonSolver,
}

impl CrankNicolson {
    pub fn new(dt: f64) -> Result<Self, Error> {
        Ok(Self {
            dt: check_dt(dt)?,
            newton: NewtonSolver::default(),
        })
    }
}

impl OdeStepper for CrankNicolson {
    fn step(&mut self, rhs: &dyn VectorField, t: f64, y: &mut VectorD) -> Result<(), Error> {
        let n = check_dim("Crank-Nicolson step", rhs, y)?;
        let y_old = y.clone();
        let mut f_old = VectorD::zeros(n);
        rhs.eval(t, &y_old, &mut f_old);
        let equ = TrapezoidalResidual {
            rhs,
            y_old: &y_old,
            f_old: &f_old,
            t_next: t + self.dt,
            dt: self.dt,
        };
        self.newton.solve(&equ, y)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// dy/dt = -y
    struct Decay;

    impl VectorField for Decay {
        fn dim(&self) -> usize {
            1
        }
        fn eval(&self, _t: f64, y: &VectorD, f: &mut VectorD) {
            f[0] = -y[0];
        }
        fn jacobian(&self, _t: f64, _y: &VectorD, jac: &mut MatrixD) {
            jac[(0, 0)] = -1.;
        }
    }

    #[test]
    fn test_explicit_euler_decay_step() {
        let mut stepper = ExplicitEuler::new(0.1, 1).expect("valid dt");
        let mut y = VectorD::from_vec(vec![1.]);
        stepper.step(&Decay, 0., &mut y).expect("step failed");
        assert_relative_eq!(y[0], 0.9);
    }

    #[test]
    fn test_implicit_euler_decay_step() {
        let mut stepper = ImplicitEuler::new(0.1).expect("valid dt");
        let mut y = VectorD::from_vec(vec![1.]);
        stepper.step(&Decay, 0., &mut y).expect("step failed");
        // u = 1 / (1 + dt)
        assert_relative_eq!(y[0], 1. / 1.1, epsilon = 1e-10);
    }

    #[test]
    fn test_crank_nicolson_decay_step() {
        let mut stepper = CrankNicolson::new(0.1).expect("valid dt");
        let mut y = VectorD::from_vec(vec![1.]);
        stepper.step(&Decay, 0., &mut y).expect("step failed");
        // u = (1 - dt/2) / (1 + dt/2)
        assert_relative_eq!(y[0], 0.95 / 1.05, epsilon = 1e-10);
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        assert!(matches!(
            ExplicitEuler::new(0., 1),
            Err(Error::InvalidParameter { name: "dt", .. })
        ));
        assert!(matches!(
            ImplicitEuler::new(-1.),
            Err(Error::InvalidParameter { name: "dt", .. })
        ));
        assert!(matches!(
            CrankNicolson::new(f64::NAN),
            Err(Error::InvalidParameter { name: "dt", .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_state() {
        let mut stepper = ExplicitEuler::new(0.1, 1).expect("valid dt");
        let mut y = VectorD::zeros(2);
        assert!(matches!(
            stepper.step(&Decay, 0., &mut y),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}

//! Generalized-alpha method for `M ddx = g(t, x, dx)` with optional algebraic
//! constraints handled through the mass operator's projection.

use serde::{Deserialize, Serialize};

use crate::newton::{NewtonSolver, Residual};
use crate::prelude::*;
use crate::system::{MassOperator, SecondOrderSystem};

/// Chung-Hulbert parameter set.
///
/// A single spectral radius at infinity controls the high-frequency
/// dissipation: `rho_inf = 1` is energy preserving, smaller values damp the
/// unresolved modes harder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlphaParams {
    pub alpha_m: f64,
    pub alpha_f: f64,
    pub gamma: f64,
    pub beta: f64,
}

impl AlphaParams {
    pub fn from_spectral_radius(rho_inf: f64) -> Result<Self, Error> {
        if !(rho_inf > 0. && rho_inf <= 1.) {
            return Err(Error::InvalidParameter {
                name: "rho_inf",
                value: rho_inf,
            });
        }
        let alpha_m = (2. * rho_inf - 1.) / (rho_inf + 1.);
        let alpha_f = rho_inf / (rho_inf + 1.);
        let gamma = 0.5 + alpha_f - alpha_m;
        let beta = 0.25 * (gamma + 0.5).powi(2);
        Ok(AlphaParams {
            alpha_m,
            alpha_f,
            gamma,
            beta,
        })
    }

    /// The classic Newmark average-acceleration scheme as a member of the
    /// alpha family.
    pub fn newmark() -> Self {
        AlphaParams {
            alpha_m: 0.,
            alpha_f: 0.,
            gamma: 0.5,
            beta: 0.25,
        }
    }
}

/// Residual in the unknown end-of-step acceleration `a`:
///
/// `M((1 - alpha_m) a + alpha_m ddx) - (1 - alpha_f) g(t + dt, x(a), v(a))
///  - alpha_f g(t, x, dx)`
struct AlphaResidual<'a> {
    rhs: &'a dyn SecondOrderSystem,
    mass: &'a dyn MassOperator,
    p: AlphaParams,
    dt: f64,
    t_old: f64,
    x_old: &'a VectorD,
    v_old: &'a VectorD,
    a_old: &'a VectorD,
    f_old: &'a VectorD,
}

impl AlphaResidual<'_> {
    fn x_of(&self, a: &VectorD) -> VectorD {
        let mut x = self.x_old.clone();
        x.axpy(self.dt, self.v_old, 1.);
        x.axpy(0.5 * self.dt * self.dt * (1. - 2. * self.p.beta), self.a_old, 1.);
        x.axpy(self.dt * self.dt * self.p.beta, a, 1.);
        x
    }

    fn v_of(&self, a: &VectorD) -> VectorD {
        let mut v = self.v_old.clone();
        v.axpy(self.dt * (1. - self.p.gamma), self.a_old, 1.);
        v.axpy(self.dt * self.p.gamma, a, 1.);
        v
    }
}

impl Residual for AlphaResidual<'_> {
    fn dim(&self) -> usize {
        self.x_old.len()
    }

    fn eval(&self, a: &VectorD, r: &mut VectorD) {
        let n = self.dim();
        let mut combo = a.clone();
        combo *= 1. - self.p.alpha_m;
        combo.axpy(self.p.alpha_m, self.a_old, 1.);
        self.mass.apply(&combo, r);

        let x = self.x_of(a);
        let v = self.v_of(a);
        let mut g = VectorD::zeros(n);
        self.rhs.force(self.t_old + self.dt, &x, &v, &mut g);
        r.axpy(-(1. - self.p.alpha_f), &g, 1.);
        r.axpy(-self.p.alpha_f, self.f_old, 1.);
    }

    fn jacobian(&self, a: &VectorD, jac: &mut MatrixD) {
        let n = self.dim();
        self.mass.matrix(jac);
        *jac *= 1. - self.p.alpha_m;

        let x = self.x_of(a);
        let v = self.v_of(a);
        let t_next = self.t_old + self.dt;
        let mut block = MatrixD::zeros(n, n);

        // d x(a)/da = beta dt^2, d v(a)/da = gamma dt
        self.rhs.force_jacobian_x(t_next, &x, &v, &mut block);
        *jac += &block * (-(1. - self.p.alpha_f) * self.p.beta * self.dt * self.dt);
        self.rhs.force_jacobian_dx(t_next, &x, &v, &mut block);
        *jac += &block * (-(1. - self.p.alpha_f) * self.p.gamma * self.dt);
    }
}

/// One-step generalized-alpha solver.
///
/// Each step solves for the end-of-step acceleration by Newton iteration,
/// reconstructs position and velocity from the Newmark expansions, and then
/// lets the mass operator project velocity and acceleration back onto the
/// constraint manifold.
pub struct GeneralizedAlphaSolver {
    params: AlphaParams,
    dt: f64,
    pub newton: NewtonSolver,
}

impl GeneralizedAlphaSolver {
    pub fn new(params: AlphaParams, dt: f64) -> Result<Self, Error> {
        if !(dt > 0. && dt.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "dt",
                value: dt,
            });
        }
        Ok(GeneralizedAlphaSolver {
            params,
            dt,
            newton: NewtonSolver::default(),
        })
    }

    pub fn params(&self) -> AlphaParams {
        self.params
    }

    /// Advances `(x, dx, ddx)` from `t` to `t + dt` in place.
    pub fn step(
        &self,
        rhs: &dyn SecondOrderSystem,
        mass: &dyn MassOperator,
        t: f64,
        x: &mut VectorD,
        dx: &mut VectorD,
        ddx: &mut VectorD,
    ) -> Result<(), Error> {
        let n = rhs.dim();
        if mass.dim() != n {
            return Err(Error::DimensionMismatch {
                op: "alpha step mass",
                expected: n,
                found: mass.dim(),
            });
        }
        for v in [&*x, &*dx, &*ddx] {
            if v.len() != n {
                return Err(Error::DimensionMismatch {
                    op: "alpha step state",
                    expected: n,
                    found: v.len(),
                });
            }
        }

        let mut f_old = VectorD::zeros(n);
        rhs.force(t, x, dx, &mut f_old);

        let equ = AlphaResidual {
            rhs,
            mass,
            p: self.params,
            dt: self.dt,
            t_old: t,
            x_old: &*x,
            v_old: &*dx,
            a_old: &*ddx,
            f_old: &f_old,
        };

        let mut a = ddx.clone();
        self.newton.solve(&equ, &mut a)?;

        let x_new = equ.x_of(&a);
        let mut v_new = equ.v_of(&a);

        // Strip multiplier drift from the differentiated quantities
        mass.project(&mut v_new)?;
        mass.project(&mut a)?;

        x.copy_from(&x_new);
        dx.copy_from(&v_new);
        ddx.copy_from(&a);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::IdentityMass;
    use approx::assert_relative_eq;

    #[test]
    fn test_spectral_radius_parameters() {
        let p = AlphaParams::from_spectral_radius(0.8).expect("valid rho");
        assert_relative_eq!(p.alpha_m, 0.6 / 1.8, epsilon = 1e-14);
        assert_relative_eq!(p.alpha_f, 0.8 / 1.8, epsilon = 1e-14);
        assert_relative_eq!(p.gamma, 0.5 + p.alpha_f - p.alpha_m, epsilon = 1e-14);
        assert_relative_eq!(p.beta, 0.25 * (p.gamma + 0.5).powi(2), epsilon = 1e-14);
    }

    #[test]
    fn test_rejects_bad_spectral_radius() {
        assert!(matches!(
            AlphaParams::from_spectral_radius(0.),
            Err(Error::InvalidParameter { name: "rho_inf", .. })
        ));
        assert!(matches!(
            AlphaParams::from_spectral_radius(1.2),
            Err(Error::InvalidParameter { name: "rho_inf", .. })
        ));
    }

    #[test]
    fn test_newmark_member() {
        let p = AlphaParams::newmark();
        assert_relative_eq!(p.gamma, 0.5);
        assert_relative_eq!(p.beta, 0.25);
        assert_relative_eq!(p.alpha_m, 0.);
        assert_relative_eq!(p.alpha_f, 0.);
    }

    struct Oscillator;

    impl SecondOrderSystem for Oscillator {
        fn dim(&self) -> usize {
            1
        }
        fn force(&self, _t: f64, x: &VectorD, _dx: &VectorD, f: &mut VectorD) {
            f[0] = -x[0];
        }
        fn force_jacobian_x(&self, _t: f64, _x: &VectorD, _dx: &VectorD, jac: &mut MatrixD) {
            jac[(0, 0)] = -1.;
        }
    }

    #[test]
    fn test_single_step_tracks_cosine() {
        let dt = 0.01;
        let solver = GeneralizedAlphaSolver::new(AlphaParams::newmark(), dt).expect("valid dt");
        let mass = IdentityMass::new(1);
        let mut x = VectorD::from_vec(vec![1.]);
        let mut dx = VectorD::zeros(1);
        let mut ddx = VectorD::from_vec(vec![-1.]);
        solver
            .step(&Oscillator, &mass, 0., &mut x, &mut dx, &mut ddx)
            .expect("step failed");
        assert_relative_eq!(x[0], dt.cos(), epsilon = 1e-6);
        assert_relative_eq!(dx[0], -dt.sin(), epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_mismatched_mass() {
        let solver =
            GeneralizedAlphaSolver::new(AlphaParams::newmark(), 0.1).expect("valid dt");
        let mass = IdentityMass::new(2);
        let mut x = VectorD::zeros(1);
        let mut dx = VectorD::zeros(1);
        let mut ddx = VectorD::zeros(1);
        assert!(matches!(
            solver.step(&Oscillator, &mass, 0., &mut x, &mut dx, &mut ddx),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}

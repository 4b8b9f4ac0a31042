use serde::{Deserialize, Serialize};

use crate::linalg;
use crate::prelude::*;

/// Nonlinear residual `r(u)` with Jacobian `dr/du`, as consumed by the Newton
/// iteration. Implementations must set every entry of the output buffers.
pub trait Residual {
    fn dim(&self) -> usize;
    fn eval(&self, u: &VectorD, r: &mut VectorD);
    fn jacobian(&self, u: &VectorD, jac: &mut MatrixD);
}

/// Newton iteration for square nonlinear systems `r(u) = 0`.
///
/// One LU solve per iteration; the iteration bound doubles as the solve-level
/// timeout, so a non-contracting residual fails instead of hanging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSolver {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NewtonSolver {
    fn default() -> Self {
        NewtonSolver {
            tolerance: 1e-10,
            max_iterations: 10,
        }
    }
}

impl NewtonSolver {
    /// Drives `u` to a root of `func`, returning the iteration count.
    pub fn solve<R: Residual + ?Sized>(&self, func: &R, u: &mut VectorD) -> Result<usize, Error> {
        let n = func.dim();
        if u.len() != n {
            return Err(Error::DimensionMismatch {
                op: "newton solve",
                expected: n,
                found: u.len(),
            });
        }

        let mut res = VectorD::zeros(n);
        let mut jac = MatrixD::zeros(n, n);
        let mut err = f64::INFINITY;

        for i in 0..self.max_iterations {
            func.eval(u, &mut res);
            err = res.norm();
            tracing::debug!(iteration = i, residual = err, "newton");
            if err < self.tolerance {
                return Ok(i);
            }

            func.jacobian(u, &mut jac);
            let du = linalg::solve(&jac, &res)?;
            *u -= du;
        }

        // One more residual check: the last update may have landed inside
        // tolerance.
        func.eval(u, &mut res);
        if res.norm() < self.tolerance {
            return Ok(self.max_iterations);
        }

        Err(Error::NewtonDidNotConverge {
            iterations: self.max_iterations,
            residual: err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// r(u) = u^2 - c, elementwise
    struct SquareRoot {
        c: VectorD,
    }

    impl Residual for SquareRoot {
        fn dim(&self) -> usize {
            self.c.len()
        }
        fn eval(&self, u: &VectorD, r: &mut VectorD) {
            for (ri, &ui, &ci) in izip!(r.iter_mut(), u.iter(), self.c.iter()) {
                *ri = ui * ui - ci;
            }
        }
        fn jacobian(&self, u: &VectorD, jac: &mut MatrixD) {
            jac.fill(0.);
            for (i, &ui) in u.iter().enumerate() {
                jac[(i, i)] = 2. * ui;
            }
        }
    }

    #[test]
    fn test_converges_to_square_roots() {
        let func = SquareRoot {
            c: VectorD::from_vec(vec![2., 9.]),
        };
        let mut u = VectorD::from_vec(vec![1., 1.]);
        let iterations = NewtonSolver::default()
            .solve(&func, &mut u)
            .expect("newton failed");
        assert!(iterations < 10);
        assert_relative_eq!(u[0], 2.0_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(u[1], 3., epsilon = 1e-9);
    }

    #[test]
    fn test_reports_divergence() {
        // Residual floor of 1 can never meet tolerance.
        struct NoRoot;
        impl Residual for NoRoot {
            fn dim(&self) -> usize {
                1
            }
            fn eval(&self, u: &VectorD, r: &mut VectorD) {
                r[0] = u[0] * u[0] + 1.;
            }
            fn jacobian(&self, u: &VectorD, jac: &mut MatrixD) {
                jac[(0, 0)] = if u[0].abs() < 1e-3 { 1. } else { 2. * u[0] };
            }
        }
        let mut u = VectorD::from_vec(vec![2.]);
        assert!(matches!(
            NewtonSolver::default().solve(&NoRoot, &mut u),
            Err(Error::NewtonDidNotConverge { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let func = SquareRoot {
            c: VectorD::from_vec(vec![4.]),
        };
        let mut u = VectorD::zeros(2);
        assert!(matches!(
            NewtonSolver::default().solve(&func, &mut u),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}

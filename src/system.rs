//! Equation-of-motion seams: right-hand-side functors, the mass-operator
//! capability consumed by the generalized-alpha solver, and the constraint
//! projector that keeps DAE states consistent.

use crate::linalg;
use crate::prelude::*;

//------------------------------------------------------------------------------
// Right-hand-side functors
//------------------------------------------------------------------------------

/// First-order right-hand side `dy/dt = f(t, y)` with Jacobian `df/dy`.
///
/// Implementations must be pure functions of `(t, y)` and their fixed
/// parameters.
pub trait VectorField {
    fn dim(&self) -> usize;
    fn eval(&self, t: f64, y: &VectorD, f: &mut VectorD);
    fn jacobian(&self, t: f64, y: &VectorD, jac: &mut MatrixD);
}

/// Generalized force `g(t, x, dx)` of a second-order system `M ddx = g`.
///
/// The state vector may carry algebraic components (Lagrange multipliers)
/// alongside the physical coordinates; the force then includes the constraint
/// residual rows. Velocity dependence is optional: conservative systems keep
/// the default zero velocity Jacobian.
pub trait SecondOrderSystem {
    fn dim(&self) -> usize;
    fn force(&self, t: f64, x: &VectorD, dx: &VectorD, f: &mut VectorD);
    fn force_jacobian_x(&self, t: f64, x: &VectorD, dx: &VectorD, jac: &mut MatrixD);
    fn force_jacobian_dx(&self, _t: f64, _x: &VectorD, _dx: &VectorD, jac: &mut MatrixD) {
        jac.fill(0.);
    }
}

/// Lowers a second-order system to the first-order form on `y = [x; dx]`,
/// so the classic one-step schemes can integrate it unmodified.
pub struct FirstOrderForm<'a, S: SecondOrderSystem + ?Sized> {
    system: &'a S,
}

impl<'a, S: SecondOrderSystem + ?Sized> FirstOrderForm<'a, S> {
    pub fn new(system: &'a S) -> Self {
        Self { system }
    }
}

impl<S: SecondOrderSystem + ?Sized> VectorField for FirstOrderForm<'_, S> {
    fn dim(&self) -> usize {
        2 * self.system.dim()
    }

    fn eval(&self, t: f64, y: &VectorD, f: &mut VectorD) {
        let n = self.system.dim();
        let x = y.rows(0, n).into_owned();
        let dx = y.rows(n, n).into_owned();

        // dx/dt = dx
        f.rows_mut(0, n).copy_from(&y.rows(n, n));

        // d(dx)/dt = g(t, x, dx)
        let mut g = VectorD::zeros(n);
        self.system.force(t, &x, &dx, &mut g);
        f.rows_mut(n, n).copy_from(&g);
    }

    fn jacobian(&self, t: f64, y: &VectorD, jac: &mut MatrixD) {
        let n = self.system.dim();
        let x = y.rows(0, n).into_owned();
        let dx = y.rows(n, n).into_owned();

        jac.fill(0.);
        jac.view_mut((0, n), (n, n)).fill_diagonal(1.);

        let mut block = MatrixD::zeros(n, n);
        self.system.force_jacobian_x(t, &x, &dx, &mut block);
        jac.view_mut((n, 0), (n, n)).copy_from(&block);
        self.system.force_jacobian_dx(t, &x, &dx, &mut block);
        jac.view_mut((n, n), (n, n)).copy_from(&block);
    }
}

//------------------------------------------------------------------------------
// Mass operators
//------------------------------------------------------------------------------

/// The mass capability of the generalized-alpha solver.
///
/// `apply` is the operator acting on an acceleration-like vector, `matrix` its
/// (constant) dense representation, and `project` the post-step consistency
/// correction, a no-op for unconstrained masses.
pub trait MassOperator {
    fn dim(&self) -> usize;
    fn apply(&self, a: &VectorD, out: &mut VectorD);
    fn matrix(&self, out: &mut MatrixD);
    fn project(&self, _v: &mut VectorD) -> Result<(), Error> {
        Ok(())
    }
}

/// Unit mass on every degree of freedom.
pub struct IdentityMass {
    n: usize,
}

impl IdentityMass {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl MassOperator for IdentityMass {
    fn dim(&self) -> usize {
        self.n
    }
    fn apply(&self, a: &VectorD, out: &mut VectorD) {
        out.copy_from(a);
    }
    fn matrix(&self, out: &mut MatrixD) {
        out.fill(0.);
        out.fill_diagonal(1.);
    }
}

//------------------------------------------------------------------------------
// Constraint projector
//------------------------------------------------------------------------------

/// Maps full coordinate vectors onto the constrained subspace.
///
/// Degrees of freedom in `[first, next)` carry momentum; components outside
/// the block are algebraic (Lagrange multipliers) and carry none. Used as the
/// mass operator of constrained runs, the projector masks the multiplier rows
/// out of the inertia term; its `project` operation corrects velocities and
/// accelerations after a step by a solve restricted to the mass block.
pub struct Projector {
    size: usize,
    first: usize,
    next: usize,
    mass_block: Option<MatrixD>,
}

impl Projector {
    pub fn new(size: usize, first: usize, next: usize) -> Result<Self, Error> {
        if first > next {
            return Err(Error::InvalidParameter {
                name: "first",
                value: first as f64,
            });
        }
        if next > size {
            return Err(Error::InvalidParameter {
                name: "next",
                value: next as f64,
            });
        }
        Ok(Self {
            size,
            first,
            next,
            mass_block: None,
        })
    }

    /// Attaches an explicit mass matrix over the momentum block.
    pub fn with_mass_block(mut self, block: MatrixD) -> Result<Self, Error> {
        let w = self.next - self.first;
        if block.nrows() != w || block.ncols() != w {
            return Err(Error::DimensionMismatch {
                op: "mass block",
                expected: w,
                found: block.nrows().max(block.ncols()),
            });
        }
        self.mass_block = Some(block);
        Ok(self)
    }

    pub fn range(&self) -> (usize, usize) {
        (self.first, self.next)
    }

    fn block_width(&self) -> usize {
        self.next - self.first
    }
}

impl MassOperator for Projector {
    fn dim(&self) -> usize {
        self.size
    }

    fn apply(&self, a: &VectorD, out: &mut VectorD) {
        out.fill(0.);
        let w = self.block_width();
        match &self.mass_block {
            Some(m) => out
                .rows_mut(self.first, w)
                .copy_from(&(m * a.rows(self.first, w))),
            None => out.rows_mut(self.first, w).copy_from(&a.rows(self.first, w)),
        }
    }

    fn matrix(&self, out: &mut MatrixD) {
        out.fill(0.);
        let w = self.block_width();
        match &self.mass_block {
            Some(m) => out.view_mut((self.first, self.first), (w, w)).copy_from(m),
            None => {
                for i in self.first..self.next {
                    out[(i, i)] = 1.;
                }
            }
        }
    }

    /// Restricted-block consistency correction.
    ///
    /// Solves `M_rr w = (M v)_r` over the momentum block, writes `w` back and
    /// zeroes the algebraic components. Applying it twice gives the same
    /// result as applying it once.
    fn project(&self, v: &mut VectorD) -> Result<(), Error> {
        if v.len() != self.size {
            return Err(Error::DimensionMismatch {
                op: "project",
                expected: self.size,
                found: v.len(),
            });
        }
        let w = self.block_width();
        let block = match &self.mass_block {
            Some(m) => m.clone(),
            None => MatrixD::identity(w, w),
        };
        let rhs = &block * v.rows(self.first, w);
        let corrected = linalg::solve(&block, &rhs).map_err(|e| match e {
            Error::SingularMatrix => Error::ConstraintSingular {
                first: self.first,
                next: self.next,
            },
            other => other,
        })?;
        v.fill(0.);
        v.rows_mut(self.first, w).copy_from(&corrected);
        Ok(())
    }
}

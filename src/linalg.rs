//! Checked dense kernel used at the API boundaries of the engine.
//!
//! Inner solver loops validate dimensions once at construction and then use
//! nalgebra arithmetic directly; these entry points are for callers whose
//! operand sizes are not known to agree.

use crate::prelude::*;

/// Solves the dense linear system `A x = b` by LU factorization.
///
/// Fails with [`Error::DimensionMismatch`] when `A` is not square or `b` has
/// the wrong length, and with [`Error::SingularMatrix`] when the pivot
/// magnitudes indicate numerical singularity.
pub fn solve(a: &MatrixD, b: &VectorD) -> Result<VectorD, Error> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            op: "solve",
            expected: a.nrows(),
            found: a.ncols(),
        });
    }
    if b.len() != a.nrows() {
        return Err(Error::DimensionMismatch {
            op: "solve",
            expected: a.nrows(),
            found: b.len(),
        });
    }

    let lu = a.clone().lu();

    // Pivot-ratio singularity estimate
    let diag = lu.u().diagonal();
    let max_pivot = diag.iter().fold(0.0_f64, |m, &p| m.max(p.abs()));
    let min_pivot = diag.iter().fold(f64::INFINITY, |m, &p| m.min(p.abs()));
    if !max_pivot.is_finite() || min_pivot <= a.nrows() as f64 * f64::EPSILON * max_pivot {
        return Err(Error::SingularMatrix);
    }

    lu.solve(b).ok_or(Error::SingularMatrix)
}

/// Matrix-vector product with operand-size checking.
pub fn mat_vec(a: &MatrixD, v: &VectorD) -> Result<VectorD, Error> {
    if a.ncols() != v.len() {
        return Err(Error::DimensionMismatch {
            op: "mat_vec",
            expected: a.ncols(),
            found: v.len(),
        });
    }
    Ok(a * v)
}

/// Matrix-matrix product with operand-size checking.
pub fn mat_mul(a: &MatrixD, b: &MatrixD) -> Result<MatrixD, Error> {
    if a.ncols() != b.nrows() {
        return Err(Error::DimensionMismatch {
            op: "mat_mul",
            expected: a.ncols(),
            found: b.nrows(),
        });
    }
    Ok(a * b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_2x2() {
        let a = MatrixD::from_row_slice(2, 2, &[4., 1., 1., 3.]);
        let b = VectorD::from_vec(vec![1., 2.]);
        let x = solve(&a, &b).expect("solve failed");
        let r = &a * &x - &b;
        assert_relative_eq!(r.norm(), 0., epsilon = 1e-12);
    }

    #[test]
    fn test_solve_rejects_singular() {
        let a = MatrixD::from_row_slice(2, 2, &[1., 2., 2., 4.]);
        let b = VectorD::from_vec(vec![1., 1.]);
        assert!(matches!(solve(&a, &b), Err(Error::SingularMatrix)));
    }

    #[test]
    fn test_solve_rejects_non_square() {
        let a = MatrixD::zeros(3, 2);
        let b = VectorD::zeros(3);
        assert!(matches!(
            solve(&a, &b),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_mat_vec_length_3_against_matrix_expecting_4() {
        let a = MatrixD::identity(4, 4);
        let v = VectorD::from_vec(vec![1., 2., 3.]);
        assert!(matches!(
            mat_vec(&a, &v),
            Err(Error::DimensionMismatch {
                expected: 4,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_mat_mul_checked() {
        let a = MatrixD::identity(2, 3);
        let b = MatrixD::identity(3, 3);
        assert!(mat_mul(&a, &b).is_ok());
        assert!(matches!(
            mat_mul(&b, &a).err(),
            Some(Error::DimensionMismatch { .. })
        ));
    }
}

use nalgebra::Dyn;

pub use itertools::{izip, Itertools};
pub use std::ops::AddAssign;

//------------------------------------------------------------------------------
// Types
//------------------------------------------------------------------------------

/// Matrix (DOFs x DOFs)
pub type MatrixD = nalgebra::OMatrix<f64, Dyn, Dyn>;

/// Column vector (Degrees of Freedom)
pub type VectorD = nalgebra::DVector<f64>;

pub use crate::error::Error;

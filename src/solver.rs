//! Time-stepping schemes: the three classic one-step methods on the
//! first-order form, and the generalized-alpha method for constrained
//! second-order systems.

pub mod alpha;
pub mod first_order;

pub use alpha::{AlphaParams, GeneralizedAlphaSolver};
pub use first_order::{CrankNicolson, ExplicitEuler, ImplicitEuler, OdeStepper};

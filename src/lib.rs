//! Time integration for ordinary and differential-algebraic equations from
//! second-order mechanical systems.
//!
//! The crate advances `(position, velocity, acceleration)` states of
//! mass-spring assemblies and constrained multibody-style dynamics over a
//! fixed time horizon. Four schemes are provided: explicit Euler, implicit
//! Euler, Crank-Nicolson, and the generalized-alpha method, the last of which
//! handles algebraic constraints through a mass-operator projection.
//!
//! Key pieces:
//! - [`system`]: right-hand-side functor traits, mass operators, and the
//!   constraint [`Projector`](system::Projector).
//! - [`solver`]: the one-step schemes and the
//!   [`GeneralizedAlphaSolver`](solver::GeneralizedAlphaSolver).
//! - [`driver`]: trajectory-producing [`run`](driver::run) plus the
//!   fixed-parameter-order `solve_ode_*` surface.
//! - [`benchmark`]: canned validation problems with fixed result layouts.

pub mod benchmark;
pub mod driver;
pub mod error;
pub mod linalg;
pub mod newton;
pub mod prelude;
pub mod solver;
pub mod system;

pub use benchmark::{test_alpha, test_exponential, test_mass_spring};
pub use driver::{
    run, solve_ode_alpha, solve_ode_cn, solve_ode_ee, solve_ode_ie, Scheme, State, Trajectory,
};
pub use error::Error;

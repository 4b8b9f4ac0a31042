use thiserror::Error;

/// Failure modes of the integration engine.
///
/// Linear-algebra and projection errors indicate a misconfigured problem and
/// abort the enclosing trajectory run; the driver wraps them in
/// [`Error::IntegrationFailure`] so callers see which scheme failed at which
/// step. Nothing is retried or swallowed.
#[derive(Debug, Error)]
pub enum Error {
    /// Operand sizes disagree.
    #[error("dimension mismatch in {op}: expected {expected}, found {found}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    /// A linear solve cannot proceed.
    #[error("matrix is numerically singular")]
    SingularMatrix,

    /// The projector's restricted mass block is not invertible.
    #[error("restricted mass block [{first}, {next}) is singular")]
    ConstraintSingular { first: usize, next: usize },

    /// Invalid step size, step count, spectral radius, or index range.
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The Newton iteration hit its iteration bound without meeting tolerance.
    #[error("Newton iteration stopped after {iterations} iterations with residual {residual:e}")]
    NewtonDidNotConverge { iterations: usize, residual: f64 },

    /// A step failed; the whole trajectory for this scheme is unusable.
    #[error("{scheme} integration failed at step {step}")]
    IntegrationFailure {
        scheme: &'static str,
        step: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn at_step(self, scheme: &'static str, step: usize) -> Error {
        Error::IntegrationFailure {
            scheme,
            step,
            source: Box::new(self),
        }
    }
}

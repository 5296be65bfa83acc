use std::fmt;
use std::error::Error;

/// Represents errors that can occur while building or querying the neighbour index.
///
/// The variants fall into two groups. Fatal errors ([`TreeError::StructuralInvariantViolation`])
/// indicate a defect in the builder and abort the whole rebuild. Recoverable errors
/// ([`TreeError::CandidateOverflow`], [`TreeError::NonConvergence`] and
/// [`TreeError::SmoothingLengthCeiling`]) are retried by the caller with a larger buffer or
/// a larger search radius.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The per-leaf particle capacity was zero.
    InvalidLeafCapacity,
    /// The spatial dimension is not 1, 2 or 3.
    InvalidDimension(usize),
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// A particle coordinate is NaN or infinite.
    NonFiniteCoordinate { particle: usize, axis: usize },
    /// A particle carries a value the index cannot work with (e.g. negative mass).
    InvalidParticle { particle: usize, reason: String },
    /// The builder produced a structure that breaks one of its own invariants.
    StructuralInvariantViolation(String),
    /// A neighbour query needed more room than the candidate buffer provides.
    CandidateOverflow { required: usize, capacity: usize },
    /// The density solver ran out of iterations for this particle.
    NonConvergence { particle: usize, iterations: usize },
    /// The converged smoothing length needs a wider search than was gathered.
    SmoothingLengthCeiling { particle: usize, h: f64, h_max: f64 },
    /// A general error for calculations that produce invalid results.
    CalculationError(String),
}

impl TreeError {
    /// Returns true for conditions the caller is expected to retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TreeError::CandidateOverflow { .. }
                | TreeError::NonConvergence { .. }
                | TreeError::SmoothingLengthCeiling { .. }
        )
    }

    /// Returns true for builder defects that must abort the rebuild.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TreeError::StructuralInvariantViolation(_))
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TreeError::InvalidLeafCapacity => write!(f, "Leaf capacity must be at least 1"),
            TreeError::InvalidDimension(d) => write!(f, "Unsupported dimension: {}", d),
            TreeError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            TreeError::NonFiniteCoordinate { particle, axis } => {
                write!(f, "Particle {} has a non-finite coordinate on axis {}", particle, axis)
            }
            TreeError::InvalidParticle { particle, reason } => {
                write!(f, "Invalid particle {}: {}", particle, reason)
            }
            TreeError::StructuralInvariantViolation(msg) => {
                write!(f, "Structural invariant violated: {}", msg)
            }
            TreeError::CandidateOverflow { required, capacity } => write!(
                f,
                "Neighbour candidate overflow: {} candidates for a buffer of {}",
                required, capacity
            ),
            TreeError::NonConvergence { particle, iterations } => write!(
                f,
                "Smoothing length of particle {} did not converge after {} iterations",
                particle, iterations
            ),
            TreeError::SmoothingLengthCeiling { particle, h, h_max } => write!(
                f,
                "Smoothing length {} of particle {} exceeds the gathered limit {}",
                h, particle, h_max
            ),
            TreeError::CalculationError(msg) => write!(f, "Calculation error: {}", msg),
        }
    }
}

impl Error for TreeError {}

//! Error types raised by the grid engine, tensor utilities, and propagator.

use thiserror::Error;

use crate::types::DiagnosticSample;

/// Failure modes of a simulation run.
///
/// Validation errors are raised eagerly when the parameter and grid objects
/// are constructed; [`GpeError::NumericalDivergence`] is the only error that
/// can occur inside the propagation loop.
#[derive(Error, Debug)]
pub enum GpeError {
    #[error("invalid physical parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("relative phase factor must have unit magnitude, got |z| = {magnitude}")]
    InvalidPhase { magnitude: f64 },

    #[error("field shapes do not match: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// The wavefunction became non-finite during step `step` (zero-based).
    /// All diagnostics sampled before the fault are carried along unchanged.
    #[error("wavefunction became non-finite during step {step}")]
    NumericalDivergence {
        step: usize,
        samples: Vec<DiagnosticSample>,
    },
}

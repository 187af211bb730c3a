//! Error type for generation and verification.

use thiserror::Error;

use crate::verify::Violation;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("grid dimensions must be positive, got {width}x{height}x{depth}")]
    InvalidDimensions { width: i32, height: i32, depth: i32 },
    #[error("GenerationInfeasible: no valid instance after {attempts} attempts")]
    GenerationInfeasible { attempts: usize },
    #[error("PartitionStuck: region growth failed after {restarts} restarts")]
    PartitionStuck { restarts: usize },
    #[error("PipeIncomplete: no covering pipe after {attempts} attempts")]
    PipeIncomplete { attempts: usize },
    #[error(transparent)]
    ConstraintViolation(#[from] Violation),
}

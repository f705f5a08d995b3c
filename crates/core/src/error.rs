use thiserror::Error;

use crate::types::IndividualId;

#[derive(Error, Debug)]
pub enum PedigreeError {
    #[error("Individual {0} not found in population")]
    NotFound(IndividualId),

    #[error("Pedigree contains a cycle ({unresolved} individuals could not be ordered)")]
    CyclicPedigree { unresolved: usize },

    #[error("Pedigree graph invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Duplicate individual ID: {0}")]
    DuplicateId(IndividualId),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PedigreeError>;

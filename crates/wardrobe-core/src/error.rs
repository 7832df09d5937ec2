use thiserror::Error;
use uuid::Uuid;

use wardrobe_domain::{ParseCategoryError, PeriodError};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(
        "Budget {budget_id} was modified concurrently (expected revision {expected}, found {found})"
    )]
    Conflict {
        budget_id: Uuid,
        expected: u64,
        found: u64,
    },
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Dependency unavailable: {0}")]
    Dependency(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl CoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict { .. })
    }
}

impl From<ParseCategoryError> for CoreError {
    fn from(err: ParseCategoryError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<PeriodError> for CoreError {
    fn from(err: PeriodError) -> Self {
        CoreError::InvalidPeriod(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

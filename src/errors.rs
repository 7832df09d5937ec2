use std::result::Result as StdResult;

use thiserror::Error;
use wardrobe_config::ConfigError;
use wardrobe_core::CoreError;

/// Unified error type for the engine, storage and configuration layers.
#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Concurrent update: {0}")]
    Conflict(String),
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Purchase store unavailable: {0}")]
    Dependency(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = StdResult<T, BudgetError>;

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] BudgetError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for BudgetError {
    fn from(err: std::io::Error) -> Self {
        BudgetError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for BudgetError {
    fn from(err: serde_json::Error) -> Self {
        BudgetError::StorageError(err.to_string())
    }
}

impl From<CoreError> for BudgetError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => BudgetError::InvalidInput(message),
            CoreError::NotFound(message) => BudgetError::NotFound(message),
            conflict @ CoreError::Conflict { .. } => BudgetError::Conflict(conflict.to_string()),
            CoreError::InvalidPeriod(message) => BudgetError::InvalidPeriod(message),
            CoreError::Dependency(message) => BudgetError::Dependency(message),
            CoreError::Storage(message) | CoreError::Serde(message) => {
                BudgetError::StorageError(message)
            }
            CoreError::Io(err) => BudgetError::StorageError(err.to_string()),
        }
    }
}

impl From<ConfigError> for BudgetError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => BudgetError::StorageError(io.to_string()),
            ConfigError::Serde(message) | ConfigError::Invalid(message) => {
                BudgetError::ConfigError(message)
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::from(BudgetError::from(err))
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::from(BudgetError::from(err))
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::from(BudgetError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn core_errors_keep_their_category() {
        let conflict = CoreError::Conflict {
            budget_id: Uuid::nil(),
            expected: 1,
            found: 2,
        };
        assert!(matches!(BudgetError::from(conflict), BudgetError::Conflict(_)));
        assert!(matches!(
            BudgetError::from(CoreError::Dependency("kidswear".into())),
            BudgetError::Dependency(_)
        ));
        assert!(matches!(
            BudgetError::from(CoreError::Validation("bad".into())),
            BudgetError::InvalidInput(_)
        ));
    }

    #[test]
    fn config_errors_map_to_config_variant() {
        let err = BudgetError::from(ConfigError::Invalid("danger".into()));
        assert_eq!(err.to_string(), "Configuration error: danger");
    }
}

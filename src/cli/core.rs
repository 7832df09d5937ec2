//! Command errors, dispatch and argument parsing shared by the handlers.

use std::{collections::BTreeMap, io};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use wardrobe_config::ConfigError;
use wardrobe_core::CoreError;

use super::output;
use crate::errors::BudgetError;
pub use crate::errors::CliError;
pub use crate::cli::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] BudgetError),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        CommandError::Core(BudgetError::from(err))
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        CommandError::Core(BudgetError::from(err))
    }
}

impl ShellContext {
    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.handler(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        if let Some(best) = self.registry.suggest(input) {
            output::hint(format!("Did you mean `{best}`?"));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        debug!(command = ?self.last_command, error = %err, "command failed");
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::Core(BudgetError::NotFound(message)) => {
                output::error(format!("Not found: {message}"));
                output::hint("Create one with `budget <user> <year> <total>`.");
            }
            other => output::error(other),
        }
        Ok(())
    }
}

pub(crate) fn usage(text: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {text}"))
}

pub(crate) fn parse_year(value: &str) -> Result<i32, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::InvalidArguments(format!("`{value}` is not a valid year")))
}

pub(crate) fn parse_month(value: &str) -> Result<u32, CommandError> {
    match value.parse::<u32>() {
        Ok(month @ 1..=12) => Ok(month),
        _ => Err(CommandError::InvalidArguments(format!(
            "`{value}` is not a month between 1 and 12"
        ))),
    }
}

/// Any finite number; sign checks are left to the engine.
pub(crate) fn parse_amount(value: &str) -> Result<f64, CommandError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| CommandError::InvalidArguments(format!("`{value}` is not a valid amount")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("`{value}` is not a date (expected YYYY-MM-DD)"))
    })
}

/// Splits `key=value` options from positional arguments. Keys are lower-cased.
pub(crate) fn split_options<'a>(args: &[&'a str]) -> (Vec<&'a str>, BTreeMap<String, &'a str>) {
    let mut positional = Vec::new();
    let mut options = BTreeMap::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                options.insert(key.trim().to_ascii_lowercase(), value.trim());
            }
            _ => positional.push(*arg),
        }
    }
    (positional, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_split_from_positionals() {
        let (positional, options) =
            split_options(&["ana", "2024", "Menswear=300", "alert=75", "=oops"]);
        assert_eq!(positional, vec!["ana", "2024", "=oops"]);
        assert_eq!(options.get("menswear"), Some(&"300"));
        assert_eq!(options.get("alert"), Some(&"75"));
    }

    #[test]
    fn months_outside_the_year_are_rejected() {
        assert_eq!(parse_month("4").unwrap(), 4);
        assert!(parse_month("13").is_err());
        assert!(parse_month("0").is_err());
    }

    #[test]
    fn dates_use_iso_format() {
        assert!(parse_date("2024-04-01").is_ok());
        assert!(parse_date("01/04/2024").is_err());
    }

    #[test]
    fn amounts_must_be_finite_numbers() {
        assert_eq!(parse_amount("12.5").unwrap(), 12.5);
        assert_eq!(parse_amount("-5").unwrap(), -5.0);
        for value in ["NaN", "inf", "-inf", "ten"] {
            assert!(parse_amount(value).is_err(), "{value} should be rejected");
        }
    }
}

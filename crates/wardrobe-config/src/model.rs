use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DATA_DIR_NAME: &str = "wardrobe-budget";

/// Engine settings persisted as `config/config.json`. Every field is
/// defaulted so older or hand-written files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_currency")]
    pub currency: String,
    #[serde(default = "EngineConfig::default_locale")]
    pub locale: String,
    #[serde(default = "EngineConfig::default_danger_threshold")]
    pub danger_threshold: f64,
    /// Warning threshold given to new budgets that do not specify one.
    #[serde(default = "EngineConfig::default_alert_threshold_value")]
    pub default_alert_threshold: f64,
    #[serde(default = "EngineConfig::default_max_append_retries")]
    pub max_append_retries: u32,
    #[serde(default = "EngineConfig::default_true")]
    pub zero_fill_monthly_report: bool,
    #[serde(default = "EngineConfig::default_true")]
    pub ui_color_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root for budget documents. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: Self::default_currency(),
            locale: Self::default_locale(),
            danger_threshold: Self::default_danger_threshold(),
            default_alert_threshold: Self::default_alert_threshold_value(),
            max_append_retries: Self::default_max_append_retries(),
            zero_fill_monthly_report: true,
            ui_color_enabled: true,
            data_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn default_locale() -> String {
        "en-US".into()
    }

    pub fn default_danger_threshold() -> f64 {
        90.0
    }

    pub fn default_alert_threshold_value() -> f64 {
        80.0
    }

    pub fn default_max_append_retries() -> u32 {
        5
    }

    fn default_true() -> bool {
        true
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(DATA_DIR_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let code = self.currency.trim();
        if code.len() != 3 || !code.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "currency `{}` is not a three-letter code",
                self.currency
            )));
        }
        for (name, value) in [
            ("danger_threshold", self.danger_threshold),
            ("default_alert_threshold", self.default_alert_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 100.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within (0, 100], got {value}"
                )));
            }
        }
        if self.default_alert_threshold >= self.danger_threshold {
            return Err(ConfigError::Invalid(format!(
                "default_alert_threshold ({}) must be below danger_threshold ({})",
                self.default_alert_threshold, self.danger_threshold
            )));
        }
        Ok(())
    }

    /// Updates one field from its textual form, as typed on the command line.
    /// The config is left untouched when the result would not validate.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        next.apply_field(key, value.trim())?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn apply_field(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "currency" => self.currency = value.to_ascii_uppercase(),
            "locale" => self.locale = value.to_string(),
            "danger_threshold" => self.danger_threshold = parse_number(key, value)?,
            "default_alert_threshold" => {
                self.default_alert_threshold = parse_number(key, value)?
            }
            "max_append_retries" => {
                self.max_append_retries = value.parse().map_err(|_| invalid_value(key, value))?
            }
            "zero_fill_monthly_report" => self.zero_fill_monthly_report = parse_flag(key, value)?,
            "ui_color_enabled" => self.ui_color_enabled = parse_flag(key, value)?,
            "data_dir" => {
                self.data_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            other => return Err(ConfigError::Invalid(format!("unknown setting `{other}`"))),
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| invalid_value(key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(invalid_value(key, value)),
    }
}

fn invalid_value(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid(format!("`{value}` is not a valid value for {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"currency":"EUR"}"#).unwrap();
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.danger_threshold, 90.0);
        assert_eq!(config.max_append_retries, 5);
        assert!(config.zero_fill_monthly_report);
    }

    #[test]
    fn alert_threshold_must_stay_below_danger() {
        let mut config = EngineConfig::default();
        assert!(config.set_field("default_alert_threshold", "95").is_err());
        assert_eq!(config.default_alert_threshold, 80.0);
        config.set_field("danger_threshold", "98").unwrap();
        config.set_field("default_alert_threshold", "95").unwrap();
        assert_eq!(config.default_alert_threshold, 95.0);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        let mut config = EngineConfig::default();
        assert!(config.set_field("theme", "dark").is_err());
        assert!(config.set_field("ui_color_enabled", "maybe").is_err());
        config.set_field("ui_color_enabled", "off").unwrap();
        assert!(!config.ui_color_enabled);
    }
}

//! Threshold configuration and notification records attached to a budget.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WARNING_PERCENTAGE: f64 = 75.0;
pub const DEFAULT_DANGER_PERCENTAGE: f64 = 90.0;
pub const EXCEEDED_PERCENTAGE: f64 = 100.0;

/// Severity of a spend alert. Ordering follows severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Danger,
    Exceeded,
}

impl AlertLevel {
    /// Most severe first.
    pub const BY_SEVERITY: [AlertLevel; 3] =
        [AlertLevel::Exceeded, AlertLevel::Danger, AlertLevel::Warning];
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
            AlertLevel::Exceeded => "exceeded",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertThreshold {
    pub percentage: f64,
    pub is_enabled: bool,
}

impl AlertThreshold {
    pub fn enabled(percentage: f64) -> Self {
        Self {
            percentage,
            is_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertThresholds {
    pub warning: AlertThreshold,
    pub danger: AlertThreshold,
    pub exceeded: AlertThreshold,
}

impl AlertThresholds {
    pub fn new(warning: f64, danger: f64) -> Self {
        Self {
            warning: AlertThreshold::enabled(warning),
            danger: AlertThreshold::enabled(danger),
            exceeded: AlertThreshold::enabled(EXCEEDED_PERCENTAGE),
        }
    }

    pub fn get(&self, level: AlertLevel) -> &AlertThreshold {
        match level {
            AlertLevel::Warning => &self.warning,
            AlertLevel::Danger => &self.danger,
            AlertLevel::Exceeded => &self.exceeded,
        }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_PERCENTAGE, DEFAULT_DANGER_PERCENTAGE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    #[serde(default)]
    pub thresholds: AlertThresholds,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    /// Highest level already notified for the current crossing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notified: Option<AlertLevel>,
}

impl AlertSettings {
    pub fn with_thresholds(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }
}

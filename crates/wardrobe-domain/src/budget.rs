//! The per-user, per-period budget document and its derived spending state.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    alert::{AlertSettings, Notification},
    common::{BudgetPeriod, Money, SpendCategory},
    transaction::Transaction,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CategoryBudget {
    pub allocated: f64,
    pub spent: f64,
    /// Share of the total budget allocated to this category, in [0, 100].
    pub percentage: f64,
}

impl CategoryBudget {
    pub fn allocated(allocated: f64) -> Self {
        Self {
            allocated,
            ..Self::default()
        }
    }
}

/// Occasion or brand sub-budget keyed by a label unique within the budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabeledBudget {
    pub label: String,
    pub allocated: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default)]
    pub priority: u8,
}

impl LabeledBudget {
    pub fn new(label: impl Into<String>, allocated: f64, priority: u8) -> Self {
        Self {
            label: label.into(),
            allocated,
            spent: 0.0,
            priority,
        }
    }
}

/// Figures derived from the transaction list; never edited directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSnapshot {
    pub total_spent: f64,
    pub remaining_budget: f64,
    pub percentage_used: f64,
    pub average_spending_per_day: f64,
    pub projected_spending: f64,
    #[serde(default)]
    pub by_brand: BTreeMap<String, f64>,
    #[serde(default)]
    pub by_occasion: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    #[default]
    Active,
    Completed,
    Exceeded,
    Paused,
    Cancelled,
}

impl BudgetStatus {
    /// Paused and cancelled budgets are only moved by an operator.
    pub fn is_operator_controlled(self) -> bool {
        matches!(self, BudgetStatus::Paused | BudgetStatus::Cancelled)
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetStatus::Active => "active",
            BudgetStatus::Completed => "completed",
            BudgetStatus::Exceeded => "exceeded",
            BudgetStatus::Paused => "paused",
            BudgetStatus::Cancelled => "cancelled",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub user: String,
    pub period: BudgetPeriod,
    pub total_budget: Money,
    pub category_budgets: BTreeMap<SpendCategory, CategoryBudget>,
    #[serde(default)]
    pub occasion_budgets: Vec<LabeledBudget>,
    #[serde(default)]
    pub brand_budgets: Vec<LabeledBudget>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub spending: SpendingSnapshot,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default)]
    pub status: BudgetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Budget::schema_version_default")]
    pub schema_version: u8,
}

impl Budget {
    pub fn new(user: impl Into<String>, period: BudgetPeriod, total_budget: Money) -> Self {
        let now = Utc::now();
        let remaining = total_budget.amount;
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
            period,
            total_budget,
            category_budgets: SpendCategory::ALL
                .into_iter()
                .map(|category| (category, CategoryBudget::default()))
                .collect(),
            occasion_budgets: Vec::new(),
            brand_budgets: Vec::new(),
            transactions: Vec::new(),
            spending: SpendingSnapshot {
                remaining_budget: remaining,
                ..SpendingSnapshot::default()
            },
            alerts: AlertSettings::default(),
            status: BudgetStatus::Active,
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn category(&self, category: SpendCategory) -> CategoryBudget {
        self.category_budgets
            .get(&category)
            .copied()
            .unwrap_or_default()
    }

    pub fn category_remaining(&self, category: SpendCategory) -> f64 {
        let entry = self.category(category);
        entry.allocated - entry.spent
    }

    pub fn unacknowledged_alerts(&self) -> impl Iterator<Item = &Notification> {
        self.alerts
            .notifications
            .iter()
            .filter(|notification| !notification.acknowledged)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}

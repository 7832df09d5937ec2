//! Automatic status transitions for a budget period.

use chrono::NaiveDate;
use tracing::info;

use wardrobe_domain::{Budget, BudgetPeriod, BudgetStatus, Money, SpendingSnapshot};

use crate::CoreError;

pub struct BudgetLifecycle;

impl BudgetLifecycle {
    /// Pure transition function. Only `active` budgets move automatically;
    /// `completed` and `exceeded` are terminal, `paused` and `cancelled`
    /// belong to the operator.
    pub fn next_status(
        current: BudgetStatus,
        today: NaiveDate,
        period: &BudgetPeriod,
        total_budget: &Money,
        spending: &SpendingSnapshot,
    ) -> BudgetStatus {
        if current != BudgetStatus::Active {
            return current;
        }
        if today > period.end_date {
            BudgetStatus::Completed
        } else if spending.total_spent > total_budget.amount {
            BudgetStatus::Exceeded
        } else {
            BudgetStatus::Active
        }
    }

    /// Applies [`BudgetLifecycle::next_status`] and returns the new status when it changed.
    pub fn transition(budget: &mut Budget, today: NaiveDate) -> Option<BudgetStatus> {
        let next = Self::next_status(
            budget.status,
            today,
            &budget.period,
            &budget.total_budget,
            &budget.spending,
        );
        if next == budget.status {
            return None;
        }
        info!(budget_id = %budget.id, from = %budget.status, to = %next, "budget status changed");
        budget.status = next;
        Some(next)
    }

    /// Operator action: pause, cancel or resume a budget.
    pub fn set_operator_status(budget: &mut Budget, status: BudgetStatus) -> Result<(), CoreError> {
        match (budget.status, status) {
            (_, to) if to != BudgetStatus::Active && !to.is_operator_controlled() => {
                Err(CoreError::Validation(format!(
                    "status `{to}` is derived and cannot be set directly"
                )))
            }
            (BudgetStatus::Cancelled, BudgetStatus::Active | BudgetStatus::Paused) => Err(
                CoreError::Validation("a cancelled budget cannot be reopened".into()),
            ),
            (BudgetStatus::Completed | BudgetStatus::Exceeded, BudgetStatus::Active) => {
                Err(CoreError::Validation(format!(
                    "a {} budget cannot be resumed",
                    budget.status
                )))
            }
            (from, to) => {
                info!(budget_id = %budget.id, from = %from, to = %to, "operator status change");
                budget.status = to;
                Ok(())
            }
        }
    }
}

//! Linear end-of-period spend projection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wardrobe_domain::{Budget, BudgetPeriod};

use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub days_elapsed: i64,
    pub total_days: i64,
    pub average_spending_per_day: f64,
    pub projected_spending: f64,
}

pub struct ProjectionEngine;

impl ProjectionEngine {
    /// Extrapolates `total_spent` over the whole period from the daily rate
    /// observed up to `as_of` (inclusive day counts).
    pub fn project(
        period: &BudgetPeriod,
        total_spent: f64,
        as_of: NaiveDate,
    ) -> Result<Projection, CoreError> {
        if period.end_date < period.start_date {
            return Err(CoreError::InvalidPeriod(format!(
                "period ends ({}) before it starts ({})",
                period.end_date, period.start_date
            )));
        }
        if as_of < period.start_date {
            return Err(CoreError::InvalidPeriod(format!(
                "projection date {} precedes period start {}",
                as_of, period.start_date
            )));
        }
        let total_days = period.total_days();
        let days_elapsed = ((as_of - period.start_date).num_days() + 1).clamp(1, total_days);
        let average_spending_per_day = total_spent / days_elapsed as f64;
        Ok(Projection {
            days_elapsed,
            total_days,
            average_spending_per_day,
            projected_spending: average_spending_per_day * total_days as f64,
        })
    }

    pub fn project_budget(budget: &Budget, as_of: NaiveDate) -> Result<Projection, CoreError> {
        Self::project(&budget.period, budget.spending.total_spent, as_of)
    }

    /// Writes the projection into the budget's spending snapshot; outside a
    /// valid window both fields are zero.
    pub fn apply(budget: &mut Budget, as_of: NaiveDate) {
        match Self::project_budget(budget, as_of) {
            Ok(projection) => {
                budget.spending.average_spending_per_day = projection.average_spending_per_day;
                budget.spending.projected_spending = projection.projected_spending;
            }
            Err(err) => {
                debug!(budget_id = %budget.id, error = %err, "projection unavailable");
                budget.spending.average_spending_per_day = 0.0;
                budget.spending.projected_spending = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_domain::PeriodKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january() -> BudgetPeriod {
        BudgetPeriod::new(date(2024, 1, 1), date(2024, 1, 31), PeriodKind::Monthly).unwrap()
    }

    #[test]
    fn projects_from_daily_rate() {
        let projection = ProjectionEngine::project(&january(), 220.0, date(2024, 1, 11)).unwrap();
        assert_eq!(projection.days_elapsed, 11);
        assert_eq!(projection.total_days, 31);
        assert_eq!(projection.average_spending_per_day, 20.0);
        assert_eq!(projection.projected_spending, 620.0);
    }

    #[test]
    fn first_day_counts_as_one_day() {
        let projection = ProjectionEngine::project(&january(), 31.0, date(2024, 1, 1)).unwrap();
        assert_eq!(projection.days_elapsed, 1);
        assert_eq!(projection.projected_spending, 961.0);
    }

    #[test]
    fn after_period_end_projection_equals_spend() {
        let projection = ProjectionEngine::project(&january(), 310.0, date(2024, 3, 1)).unwrap();
        assert_eq!(projection.days_elapsed, 31);
        assert_eq!(projection.projected_spending, 310.0);
    }

    #[test]
    fn before_start_is_an_invalid_period() {
        let err = ProjectionEngine::project(&january(), 10.0, date(2023, 12, 31)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPeriod(_)));
    }

    #[test]
    fn reversed_period_is_rejected_without_dividing() {
        let period = BudgetPeriod {
            start_date: date(2024, 2, 1),
            end_date: date(2024, 1, 1),
            kind: PeriodKind::EventBased,
        };
        assert!(ProjectionEngine::project(&period, 10.0, date(2024, 2, 2)).is_err());
    }

    #[test]
    fn apply_zeroes_fields_outside_the_window() {
        let mut budget = Budget::new("ana", january(), wardrobe_domain::Money::usd(100.0));
        budget.spending.total_spent = 50.0;
        ProjectionEngine::apply(&mut budget, date(2023, 6, 1));
        assert_eq!(budget.spending.projected_spending, 0.0);
        ProjectionEngine::apply(&mut budget, date(2024, 1, 10));
        assert_eq!(budget.spending.average_spending_per_day, 5.0);
        assert_eq!(budget.spending.projected_spending, 155.0);
    }
}

//! Affordability check for an upcoming event against the current budget.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use wardrobe_domain::{Budget, SpendCategory};

use crate::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub user: String,
    pub event: String,
    pub estimated_budget: f64,
    pub target_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FuturePlan {
    pub event: String,
    pub estimated_budget: f64,
    pub target_date: NaiveDate,
    pub spent_this_year: f64,
    pub remaining_budget: f64,
    pub can_afford: bool,
    pub shortfall: f64,
    pub months_until_event: i64,
    pub recommendations: Vec<String>,
}

pub struct FuturePlanner;

impl FuturePlanner {
    pub fn plan(
        budget: &Budget,
        request: &PlanRequest,
        today: NaiveDate,
    ) -> Result<FuturePlan, CoreError> {
        let event = request.event.trim();
        if event.is_empty() {
            return Err(CoreError::Validation("event name is required".into()));
        }
        if !request.estimated_budget.is_finite() || request.estimated_budget <= 0.0 {
            return Err(CoreError::Validation(format!(
                "estimated budget must be positive, got {}",
                request.estimated_budget
            )));
        }
        if request.target_date < today {
            return Err(CoreError::Validation(format!(
                "target date {} is in the past",
                request.target_date
            )));
        }

        let spent = budget.spending.total_spent;
        let remaining = budget.total_budget.amount - spent;
        let can_afford = request.estimated_budget <= remaining;
        let shortfall = (request.estimated_budget - remaining).max(0.0);
        let days = (request.target_date - today).num_days();
        let months_until_event = ((days + 29) / 30).max(1);
        let currency = budget.total_budget.currency.as_str();

        let mut recommendations = Vec::new();
        if can_afford {
            recommendations.push(format!(
                "You can afford {event}: {:.2} {currency} would remain afterwards.",
                remaining - request.estimated_budget
            ));
            if remaining > 0.0 && request.estimated_budget > remaining * 0.5 {
                recommendations.push(format!(
                    "{event} uses {:.0}% of what is left; hold off on other purchases until {}.",
                    100.0 * request.estimated_budget / remaining,
                    request.target_date
                ));
            }
        } else {
            recommendations.push(format!(
                "Set aside {:.2} {currency} per month until {} to cover a {:.2} {currency} shortfall.",
                shortfall / months_until_event as f64,
                request.target_date,
                shortfall
            ));
            if remaining <= 0.0 {
                recommendations.push(
                    "This year's budget is already used up; consider raising the total budget."
                        .to_string(),
                );
            }
            if let Some((category, amount)) = top_category(budget) {
                recommendations.push(format!(
                    "Spending is highest in {category} ({amount:.2} {currency}); trim it first."
                ));
            }
        }
        if budget.spending.projected_spending > budget.total_budget.amount {
            recommendations.push(format!(
                "Projected spending of {:.2} {currency} is above the {:.2} {currency} budget.",
                budget.spending.projected_spending, budget.total_budget.amount
            ));
        }

        Ok(FuturePlan {
            event: event.to_string(),
            estimated_budget: request.estimated_budget,
            target_date: request.target_date,
            spent_this_year: spent,
            remaining_budget: remaining,
            can_afford,
            shortfall,
            months_until_event,
            recommendations,
        })
    }
}

fn top_category(budget: &Budget) -> Option<(SpendCategory, f64)> {
    budget
        .category_budgets
        .iter()
        .map(|(category, entry)| (*category, entry.spent))
        .filter(|(_, spent)| *spent > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

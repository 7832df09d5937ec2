//! Threshold evaluation and notification de-duplication.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use wardrobe_domain::{AlertLevel, AlertThresholds, Budget, Notification};

pub struct AlertEngine;

impl AlertEngine {
    /// Highest enabled level whose threshold `percentage_used` has reached.
    pub fn applicable_level(
        percentage_used: f64,
        thresholds: &AlertThresholds,
    ) -> Option<AlertLevel> {
        AlertLevel::BY_SEVERITY.into_iter().find(|level| {
            let threshold = thresholds.get(*level);
            threshold.is_enabled && percentage_used >= threshold.percentage
        })
    }

    /// Appends at most one notification: the most severe applicable level, and
    /// only when it is more severe than what was already notified for this
    /// crossing. Falling below a notified level re-arms it.
    pub fn evaluate(budget: &mut Budget, now: DateTime<Utc>) -> Vec<Notification> {
        let percentage = budget.spending.percentage_used;
        let current = Self::applicable_level(percentage, &budget.alerts.thresholds);
        let last = budget.alerts.last_notified;

        match current {
            Some(level) if last < Some(level) => {
                let threshold = budget.alerts.thresholds.get(level).percentage;
                let notification = Notification {
                    level,
                    message: alert_message(level, percentage, threshold, budget),
                    sent_at: now,
                    acknowledged: false,
                };
                info!(
                    budget_id = %budget.id,
                    level = %level,
                    percentage_used = percentage,
                    "budget alert fired"
                );
                budget.alerts.notifications.push(notification.clone());
                budget.alerts.last_notified = Some(level);
                vec![notification]
            }
            _ => {
                if current < last {
                    debug!(
                        budget_id = %budget.id,
                        percentage_used = percentage,
                        "spend dropped below notified level; re-arming alerts"
                    );
                    budget.alerts.last_notified = current;
                }
                Vec::new()
            }
        }
    }

    /// Marks every pending notification as seen. Returns how many changed.
    pub fn acknowledge_all(budget: &mut Budget) -> usize {
        let mut changed = 0;
        for notification in budget
            .alerts
            .notifications
            .iter_mut()
            .filter(|notification| !notification.acknowledged)
        {
            notification.acknowledged = true;
            changed += 1;
        }
        changed
    }
}

fn alert_message(level: AlertLevel, percentage: f64, threshold: f64, budget: &Budget) -> String {
    match level {
        AlertLevel::Exceeded => format!(
            "Budget exceeded: {:.1}% of {:.2} {} spent",
            percentage, budget.total_budget.amount, budget.total_budget.currency
        ),
        _ => format!(
            "Budget {} alert: {:.1}% used (threshold {:.0}%)",
            level, percentage, threshold
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation_service::BudgetAggregator;
    use crate::ledger_service::TransactionLedger;
    use chrono::NaiveDate;
    use wardrobe_domain::{BudgetPeriod, Money, NewTransaction};

    fn spend(budget: &Budget, amount: f64) -> Budget {
        let draft = NewTransaction::new(
            "sku",
            "womenswear",
            amount,
            "womenswear",
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        );
        TransactionLedger::append(budget, &draft, Utc::now()).unwrap()
    }

    fn budget() -> Budget {
        Budget::new("ana", BudgetPeriod::annual(2024).unwrap(), Money::usd(1000.0))
    }

    #[test]
    fn only_the_most_severe_level_fires() {
        let mut budget = spend(&budget(), 950.0);
        let fired = AlertEngine::evaluate(&mut budget, Utc::now());
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].level, AlertLevel::Danger);
    }

    #[test]
    fn repeated_evaluation_does_not_duplicate() {
        let mut budget = spend(&budget(), 750.0);
        assert_eq!(AlertEngine::evaluate(&mut budget, Utc::now()).len(), 1);
        assert!(AlertEngine::evaluate(&mut budget, Utc::now()).is_empty());
        assert_eq!(budget.alerts.notifications.len(), 1);
    }

    #[test]
    fn disabled_levels_fall_through_to_the_next_enabled_level() {
        let mut budget = spend(&budget(), 1200.0);
        budget.alerts.thresholds.exceeded.is_enabled = false;
        let fired = AlertEngine::evaluate(&mut budget, Utc::now());
        assert_eq!(fired[0].level, AlertLevel::Danger);
    }

    #[test]
    fn dropping_below_a_level_re_arms_it() {
        let mut budget = spend(&budget(), 800.0);
        AlertEngine::evaluate(&mut budget, Utc::now());
        assert_eq!(budget.alerts.last_notified, Some(AlertLevel::Warning));

        budget.total_budget.amount = 2000.0;
        BudgetAggregator::recompute_in_place(&mut budget);
        assert!(AlertEngine::evaluate(&mut budget, Utc::now()).is_empty());
        assert_eq!(budget.alerts.last_notified, None);

        budget.total_budget.amount = 1000.0;
        BudgetAggregator::recompute_in_place(&mut budget);
        assert_eq!(AlertEngine::evaluate(&mut budget, Utc::now()).len(), 1);
    }

    #[test]
    fn acknowledge_all_marks_pending_notifications() {
        let mut budget = spend(&budget(), 1000.0);
        AlertEngine::evaluate(&mut budget, Utc::now());
        assert_eq!(AlertEngine::acknowledge_all(&mut budget), 1);
        assert_eq!(budget.unacknowledged_alerts().count(), 0);
        assert_eq!(AlertEngine::acknowledge_all(&mut budget), 0);
    }
}

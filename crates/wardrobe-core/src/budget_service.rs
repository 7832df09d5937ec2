//! Facade exposing the engine operations over a budget store, the purchase
//! catalog and a clock.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use wardrobe_domain::{
    AlertLevel, AlertSettings, AlertThresholds, Budget, BudgetPeriod, BudgetStatus,
    CategoryBudget, CurrencyCode, LabeledBudget, Money, NewTransaction, SpendCategory,
    DEFAULT_DANGER_PERCENTAGE,
};

use crate::{
    aggregation_service::BudgetAggregator,
    alert_service::AlertEngine,
    catalog::{collect_purchases, PurchaseCatalog},
    ledger_service::TransactionLedger,
    lifecycle_service::BudgetLifecycle,
    planning_service::{FuturePlan, FuturePlanner, PlanRequest},
    projection_service::ProjectionEngine,
    report_service::{ReportFormat, ReportGenerator, ReportScope, SpendingReport},
    storage::BudgetStore,
    time::Clock,
    CoreError,
};

pub const DEFAULT_ALERT_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MAX_APPEND_RETRIES: u32 = 5;

/// Engine knobs, usually filled from the persisted configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub currency: CurrencyCode,
    pub danger_threshold: f64,
    /// Warning threshold applied when a budget request does not name one.
    pub default_alert_threshold: f64,
    /// Retries after the first attempt when a write hits a revision conflict.
    pub max_append_retries: u32,
    pub zero_fill_monthly: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::default(),
            danger_threshold: DEFAULT_DANGER_PERCENTAGE,
            default_alert_threshold: DEFAULT_ALERT_THRESHOLD,
            max_append_retries: DEFAULT_MAX_APPEND_RETRIES,
            zero_fill_monthly: true,
        }
    }
}

/// Input of [`BudgetService::create_or_update_budget`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    pub user: String,
    pub year: i32,
    pub total_budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Category label to allocated amount. Unlisted categories keep their
    /// current allocation.
    #[serde(default)]
    pub category_budgets: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<f64>,
    /// Brand sub-budgets. Labels are unique ignoring case; an existing
    /// budget keeps labels the request does not mention.
    #[serde(default)]
    pub brand_budgets: Vec<LabeledBudget>,
    #[serde(default)]
    pub occasion_budgets: Vec<LabeledBudget>,
}

impl BudgetRequest {
    pub fn new(user: impl Into<String>, year: i32, total_budget: f64) -> Self {
        Self {
            user: user.into(),
            year,
            total_budget,
            currency: None,
            category_budgets: BTreeMap::new(),
            alert_threshold: None,
            brand_budgets: Vec::new(),
            occasion_budgets: Vec::new(),
        }
    }

    pub fn with_allocation(mut self, category: impl Into<String>, amount: f64) -> Self {
        self.category_budgets.insert(category.into(), amount);
        self
    }

    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }

    pub fn with_brand_budget(mut self, brand: impl Into<String>, amount: f64) -> Self {
        self.brand_budgets.push(LabeledBudget::new(brand, amount, 0));
        self
    }

    pub fn with_occasion_budget(mut self, occasion: impl Into<String>, amount: f64) -> Self {
        self.occasion_budgets.push(LabeledBudget::new(occasion, amount, 0));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryComparison {
    pub category: SpendCategory,
    pub allocated: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percentage_used: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryAlert {
    /// `None` for the budget as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SpendCategory>,
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub percentage_used: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub user: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub total_spending: f64,
    pub spending_by_category: BTreeMap<SpendCategory, f64>,
    pub budget_comparison: Vec<CategoryComparison>,
    pub alerts: Vec<SummaryAlert>,
}

/// Entry point used by the CLI and embedders. Every write is a
/// read-modify-compare-and-swap against the store.
pub struct BudgetService {
    store: Arc<dyn BudgetStore>,
    catalog: Arc<dyn PurchaseCatalog>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl BudgetService {
    pub fn new(
        store: Arc<dyn BudgetStore>,
        catalog: Arc<dyn PurchaseCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_settings(store, catalog, clock, ServiceSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn BudgetStore>,
        catalog: Arc<dyn PurchaseCatalog>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Sets up the user's annual budget for `year`, or updates the totals,
    /// allocations, brand and occasion sub-budgets and warning threshold of
    /// the existing one.
    pub fn create_or_update_budget(&self, request: &BudgetRequest) -> Result<Budget, CoreError> {
        let user = request.user.trim();
        if user.is_empty() {
            return Err(CoreError::Validation("user is required".into()));
        }
        check_amount("total budget", request.total_budget)?;
        let currency = self.resolve_currency(request.currency.as_deref())?;
        let allocations = parse_allocations(&request.category_budgets)?;
        let warning = request
            .alert_threshold
            .unwrap_or(self.settings.default_alert_threshold);
        let thresholds = self.thresholds_for(warning)?;

        let brands = parse_labels("brand", &request.brand_budgets)?;
        let occasions = parse_labels("occasion", &request.occasion_budgets)?;

        // A concurrent create for the same slot surfaces as an insert conflict;
        // the next pass finds that budget and updates it instead.
        let mut attempt = 0;
        loop {
            if let Some(existing) = self.store.find_annual(user, request.year)? {
                return self.mutate(existing.value.id, "update budget", |current| {
                    let mut next = current.clone();
                    next.total_budget = Money::new(request.total_budget, currency.clone());
                    for (category, amount) in &allocations {
                        next.category_budgets.entry(*category).or_default().allocated = *amount;
                    }
                    merge_labels(&mut next.brand_budgets, &brands);
                    merge_labels(&mut next.occasion_budgets, &occasions);
                    next.alerts.thresholds.warning.percentage = thresholds.warning.percentage;
                    next.alerts.thresholds.danger.percentage = thresholds.danger.percentage;
                    self.refresh_derived(&mut next);
                    Ok(next)
                });
            }

            let period = BudgetPeriod::annual(request.year)?;
            let total = Money::new(request.total_budget, currency.clone());
            let mut budget = Budget::new(user, period, total);
            for (category, amount) in &allocations {
                budget.category_budgets.insert(*category, CategoryBudget::allocated(*amount));
            }
            budget.brand_budgets = brands.clone();
            budget.occasion_budgets = occasions.clone();
            budget.alerts = AlertSettings::with_thresholds(thresholds);
            let now = self.clock.now();
            budget.created_at = now;
            budget.updated_at = now;
            BudgetAggregator::recompute_in_place(&mut budget);
            ProjectionEngine::apply(&mut budget, self.clock.today());
            match self.store.insert(&budget) {
                Ok(_) => {
                    info!(budget_id = %budget.id, user, year = request.year, "budget created");
                    return Ok(budget);
                }
                Err(err) if err.is_conflict() && attempt < self.settings.max_append_retries => {
                    attempt += 1;
                    debug!(user, year = request.year, error = %err, "budget created concurrently");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Appends a purchase to the budget's ledger and returns the recomputed
    /// budget. Revision conflicts are retried against a fresh read.
    pub fn record_transaction(
        &self,
        budget_id: Uuid,
        draft: &NewTransaction,
    ) -> Result<Budget, CoreError> {
        self.mutate(budget_id, "record transaction", |current| {
            if current.status == BudgetStatus::Cancelled {
                return Err(CoreError::Validation(format!(
                    "budget {} is cancelled and no longer accepts transactions",
                    current.id
                )));
            }
            let mut next = TransactionLedger::append(current, draft, self.clock.now())?;
            self.refresh_derived(&mut next);
            Ok(next)
        })
    }

    /// Category totals for the scope read from the item-family stores, compared
    /// against the user's budget for that year.
    pub fn get_spending_summary(
        &self,
        user: &str,
        year: i32,
        month: Option<u32>,
    ) -> Result<SpendingSummary, CoreError> {
        let scope = ReportScope {
            month,
            ..ReportScope::year(user, year)
        };
        let purchases = collect_purchases(self.catalog.as_ref(), user, &scope.date_range()?)?;

        let mut spending_by_category: BTreeMap<SpendCategory, f64> = SpendCategory::ALL
            .into_iter()
            .map(|category| (category, 0.0))
            .collect();
        for record in &purchases {
            *spending_by_category
                .entry(record.spend_category())
                .or_insert(0.0) += record.final_price;
        }
        let total_spending = spending_by_category.values().sum();

        let mut summary = SpendingSummary {
            user: user.to_string(),
            year,
            month,
            total_spending,
            spending_by_category,
            budget_comparison: Vec::new(),
            alerts: Vec::new(),
        };
        match self.store.find_annual(user, year)? {
            Some(entry) => compare_with_budget(&mut summary, &entry.value),
            None => debug!(user, year, "no budget for summary comparison"),
        }
        Ok(summary)
    }

    pub fn generate_spending_report(
        &self,
        scope: &ReportScope,
        format: ReportFormat,
    ) -> Result<SpendingReport, CoreError> {
        ReportGenerator::new(self.catalog.as_ref())
            .with_zero_fill(self.settings.zero_fill_monthly)
            .generate(scope, format, self.clock.now())
    }

    /// Checks an upcoming event against the budget for the current year.
    pub fn plan_future_budget(&self, request: &PlanRequest) -> Result<FuturePlan, CoreError> {
        let today = self.clock.today();
        let budget = self.find_budget(&request.user, today.year())?;
        FuturePlanner::plan(&budget, request, today)
    }

    pub fn get_budget(&self, budget_id: Uuid) -> Result<Budget, CoreError> {
        Ok(self.store.load(budget_id)?.value)
    }

    pub fn find_budget(&self, user: &str, year: i32) -> Result<Budget, CoreError> {
        self.store
            .find_annual(user, year)?
            .map(|entry| entry.value)
            .ok_or_else(|| CoreError::NotFound(format!("budget for {user} in {year}")))
    }

    pub fn list_budgets(&self, user: &str) -> Result<Vec<Budget>, CoreError> {
        Ok(self
            .store
            .list_for_user(user)?
            .into_iter()
            .map(|entry| entry.value)
            .collect())
    }

    /// Re-derives aggregates, projection, alerts and status as of today.
    pub fn refresh_budget(&self, budget_id: Uuid) -> Result<Budget, CoreError> {
        self.mutate(budget_id, "refresh budget", |current| {
            let mut next = current.clone();
            self.refresh_derived(&mut next);
            Ok(next)
        })
    }

    pub fn acknowledge_alerts(&self, budget_id: Uuid) -> Result<Budget, CoreError> {
        self.mutate(budget_id, "acknowledge alerts", |current| {
            let mut next = current.clone();
            let changed = AlertEngine::acknowledge_all(&mut next);
            debug!(budget_id = %next.id, changed, "alerts acknowledged");
            next.updated_at = self.clock.now();
            Ok(next)
        })
    }

    pub fn set_operator_status(
        &self,
        budget_id: Uuid,
        status: BudgetStatus,
    ) -> Result<Budget, CoreError> {
        self.mutate(budget_id, "set status", |current| {
            let mut next = current.clone();
            BudgetLifecycle::set_operator_status(&mut next, status)?;
            if status == BudgetStatus::Active {
                BudgetLifecycle::transition(&mut next, self.clock.today());
            }
            next.updated_at = self.clock.now();
            Ok(next)
        })
    }

    fn refresh_derived(&self, budget: &mut Budget) {
        let now = self.clock.now();
        let today = self.clock.today();
        BudgetAggregator::recompute_in_place(budget);
        ProjectionEngine::apply(budget, today);
        AlertEngine::evaluate(budget, now);
        BudgetLifecycle::transition(budget, today);
        budget.updated_at = now;
    }

    /// Load, apply, compare-and-swap; on a revision conflict start over from
    /// a fresh read, at most `max_append_retries` more times.
    fn mutate<F>(&self, budget_id: Uuid, action: &str, apply: F) -> Result<Budget, CoreError>
    where
        F: Fn(&Budget) -> Result<Budget, CoreError>,
    {
        let retries = self.settings.max_append_retries;
        let mut attempt = 0;
        loop {
            let current = self.store.load(budget_id)?;
            let next = apply(&current.value)?;
            match self.store.compare_and_swap(&next, current.revision) {
                Ok(revision) => {
                    debug!(%budget_id, action, revision, "budget written");
                    return Ok(next);
                }
                Err(err) if err.is_conflict() && attempt < retries => {
                    attempt += 1;
                    warn!(%budget_id, action, attempt, error = %err, "write conflict; retrying");
                }
                Err(err) => {
                    if err.is_conflict() {
                        warn!(
                            %budget_id,
                            action,
                            attempts = attempt + 1,
                            "giving up after repeated conflicts"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }

    fn resolve_currency(&self, requested: Option<&str>) -> Result<CurrencyCode, CoreError> {
        let currency = match requested {
            Some(code) => CurrencyCode::new(code),
            None => self.settings.currency.clone(),
        };
        if currency.is_well_formed() {
            Ok(currency)
        } else {
            Err(CoreError::Validation(format!("invalid currency code `{currency}`")))
        }
    }

    fn thresholds_for(&self, warning: f64) -> Result<AlertThresholds, CoreError> {
        let danger = self.settings.danger_threshold;
        if !warning.is_finite() || warning <= 0.0 || warning > 100.0 {
            return Err(CoreError::Validation(format!(
                "alert threshold must be within (0, 100], got {warning}"
            )));
        }
        if warning >= danger {
            return Err(CoreError::Validation(format!(
                "alert threshold {warning} must be below the danger threshold {danger}"
            )));
        }
        Ok(AlertThresholds::new(warning, danger))
    }
}

fn check_amount(label: &str, amount: f64) -> Result<(), CoreError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{label} must be a non-negative number, got {amount}"
        )))
    }
}

fn parse_allocations(
    raw: &BTreeMap<String, f64>,
) -> Result<BTreeMap<SpendCategory, f64>, CoreError> {
    let mut parsed = BTreeMap::new();
    for (label, amount) in raw {
        let category: SpendCategory = label.parse()?;
        check_amount(&format!("allocation for {category}"), *amount)?;
        parsed.insert(category, *amount);
    }
    Ok(parsed)
}

/// Trims labels, rejects blanks, case-insensitive duplicates and invalid amounts.
fn parse_labels(kind: &str, raw: &[LabeledBudget]) -> Result<Vec<LabeledBudget>, CoreError> {
    let mut parsed: Vec<LabeledBudget> = Vec::with_capacity(raw.len());
    for entry in raw {
        let label = entry.label.trim();
        if label.is_empty() {
            return Err(CoreError::Validation(format!("{kind} label is required")));
        }
        if parsed.iter().any(|seen| same_label(&seen.label, label)) {
            return Err(CoreError::Validation(format!(
                "{kind} `{label}` is listed more than once"
            )));
        }
        check_amount(&format!("{kind} budget for {label}"), entry.allocated)?;
        parsed.push(LabeledBudget::new(label, entry.allocated, entry.priority));
    }
    Ok(parsed)
}

fn same_label(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn merge_labels(current: &mut Vec<LabeledBudget>, updates: &[LabeledBudget]) {
    for update in updates {
        match current
            .iter_mut()
            .find(|entry| same_label(&entry.label, &update.label))
        {
            Some(entry) => {
                entry.allocated = update.allocated;
                entry.priority = update.priority;
            }
            None => current.push(update.clone()),
        }
    }
}

fn compare_with_budget(summary: &mut SpendingSummary, budget: &Budget) {
    // Monthly scopes are compared against a twelfth of the annual figures.
    let scale = if summary.month.is_some() { 12.0 } else { 1.0 };
    let thresholds = &budget.alerts.thresholds;

    for (category, spent) in &summary.spending_by_category {
        let allocated = budget.category(*category).allocated / scale;
        let percentage_used = BudgetAggregator::percentage_of(*spent, allocated);
        summary.budget_comparison.push(CategoryComparison {
            category: *category,
            allocated,
            spent: *spent,
            remaining: allocated - spent,
            percentage_used,
        });
        if allocated > 0.0 {
            if let Some(level) = AlertEngine::applicable_level(percentage_used, thresholds) {
                summary.alerts.push(SummaryAlert {
                    category: Some(*category),
                    level,
                    percentage_used,
                    message: format!(
                        "{category} spending is at {percentage_used:.1}% of its allocation"
                    ),
                });
            }
        }
    }

    let total = budget.total_budget.amount / scale;
    if total > 0.0 {
        let percentage_used = BudgetAggregator::percentage_of(summary.total_spending, total);
        if let Some(level) = AlertEngine::applicable_level(percentage_used, thresholds) {
            summary.alerts.push(SummaryAlert {
                category: None,
                level,
                percentage_used,
                message: format!("total spending is at {percentage_used:.1}% of the budget"),
            });
        }
    }
}

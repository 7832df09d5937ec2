//! Derives every spending aggregate of a budget from its transaction list.

use std::collections::BTreeMap;

use tracing::debug;

use wardrobe_domain::{Budget, LabeledBudget, SpendCategory};

/// Stateless recompute of the derived spending state.
///
/// Output depends only on `transactions`, `total_budget` and the configured
/// allocations, so calling it repeatedly on the same ledger is a no-op.
pub struct BudgetAggregator;

impl BudgetAggregator {
    pub fn recompute(budget: &Budget) -> Budget {
        let mut next = budget.clone();
        Self::recompute_in_place(&mut next);
        next
    }

    pub fn recompute_in_place(budget: &mut Budget) {
        let mut total = 0.0;
        let mut per_category: BTreeMap<SpendCategory, f64> = SpendCategory::ALL
            .into_iter()
            .map(|category| (category, 0.0))
            .collect();
        let mut brands = LabelTotals::default();
        let mut occasions = LabelTotals::default();

        for txn in &budget.transactions {
            total += txn.amount;
            *per_category.entry(txn.category).or_insert(0.0) += txn.amount;
            if let Some(brand) = txn.brand.as_deref() {
                brands.add(brand, txn.amount);
            }
            if let Some(occasion) = txn.occasion.as_deref() {
                occasions.add(occasion, txn.amount);
            }
        }

        let total_amount = budget.total_budget.amount;
        for (category, spent) in per_category {
            let entry = budget.category_budgets.entry(category).or_default();
            entry.spent = spent;
            entry.percentage = allocation_share(entry.allocated, total_amount);
        }
        apply_label_totals(&mut budget.brand_budgets, &brands);
        apply_label_totals(&mut budget.occasion_budgets, &occasions);

        let spending = &mut budget.spending;
        spending.total_spent = total;
        spending.remaining_budget = total_amount - total;
        spending.percentage_used = Self::percentage_of(total, total_amount);
        spending.by_brand = brands.into_map();
        spending.by_occasion = occasions.into_map();

        debug!(
            budget_id = %budget.id,
            transactions = budget.transactions.len(),
            total_spent = total,
            percentage_used = spending.percentage_used,
            "recomputed budget aggregates"
        );
    }

    /// `100 × spent / budget`, or 0 for a zero budget.
    pub fn percentage_of(spent: f64, budget: f64) -> f64 {
        if budget == 0.0 {
            0.0
        } else {
            100.0 * spent / budget
        }
    }
}

fn allocation_share(allocated: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (100.0 * allocated / total).clamp(0.0, 100.0)
}

fn apply_label_totals(entries: &mut [LabeledBudget], totals: &LabelTotals) {
    for entry in entries {
        entry.spent = totals.get(&entry.label);
    }
}

/// Groups amounts by label case-insensitively, keeping the first spelling seen.
#[derive(Default)]
struct LabelTotals {
    entries: BTreeMap<String, (String, f64)>,
}

impl LabelTotals {
    fn add(&mut self, label: &str, amount: f64) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        self.entries
            .entry(label.to_lowercase())
            .or_insert_with(|| (label.to_string(), 0.0))
            .1 += amount;
    }

    fn get(&self, label: &str) -> f64 {
        self.entries
            .get(&label.trim().to_lowercase())
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0)
    }

    fn into_map(self) -> BTreeMap<String, f64> {
        self.entries.into_values().collect()
    }
}

//! Append-only transaction ledger. The only entry point for spend data.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use wardrobe_domain::{Budget, ItemFamily, NewTransaction, SpendCategory, Transaction};

use crate::{aggregation_service::BudgetAggregator, CoreError};

pub struct TransactionLedger;

impl TransactionLedger {
    /// Checks a raw purchase event and converts it into a ledger entry.
    pub fn validate(
        draft: &NewTransaction,
        recorded_at: DateTime<Utc>,
    ) -> Result<Transaction, CoreError> {
        if !draft.amount.is_finite() || draft.amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "transaction amount must be a non-negative number, got {}",
                draft.amount
            )));
        }
        let item_id = draft.item_id.trim();
        if item_id.is_empty() {
            return Err(CoreError::Validation("transaction item id is required".into()));
        }
        let category: SpendCategory = draft.category.parse()?;
        let item_type: ItemFamily = draft.item_type.parse().map_err(|_| {
            CoreError::Validation(format!("unknown item type `{}`", draft.item_type.trim()))
        })?;

        Ok(Transaction {
            id: Uuid::new_v4(),
            item_id: item_id.to_string(),
            item_type,
            amount: draft.amount,
            category,
            brand: non_blank(draft.brand.as_deref()),
            occasion: non_blank(draft.occasion.as_deref()),
            date: draft.date,
            store: non_blank(draft.store.as_deref()),
            notes: non_blank(draft.notes.as_deref()),
            recorded_at,
        })
    }

    /// Appends a validated transaction and returns the budget with fresh aggregates.
    pub fn append(
        budget: &Budget,
        draft: &NewTransaction,
        recorded_at: DateTime<Utc>,
    ) -> Result<Budget, CoreError> {
        let transaction = Self::validate(draft, recorded_at)?;
        let mut next = budget.clone();
        debug!(
            budget_id = %next.id,
            transaction_id = %transaction.id,
            amount = transaction.amount,
            category = %transaction.category,
            "appending transaction"
        );
        next.transactions.push(transaction);
        BudgetAggregator::recompute_in_place(&mut next);
        next.updated_at = recorded_at;
        Ok(next)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

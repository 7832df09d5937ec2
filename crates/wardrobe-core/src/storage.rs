//! Persistence contract for budgets with optimistic concurrency control.

use std::{collections::HashMap, sync::RwLock};

use uuid::Uuid;

use wardrobe_domain::{Budget, PeriodKind};

use crate::CoreError;

/// A stored value together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

/// Abstraction over budget persistence.
///
/// Every write after the initial insert goes through [`BudgetStore::compare_and_swap`],
/// which must fail with [`CoreError::Conflict`] when the stored revision no longer
/// matches the revision the caller read.
pub trait BudgetStore: Send + Sync {
    /// Stores a new budget at revision 1.
    ///
    /// A user holds at most one annual budget per year: when one already
    /// exists the insert fails with [`CoreError::Conflict`] naming the stored
    /// budget and `expected: 0`. The check and the write are atomic.
    fn insert(&self, budget: &Budget) -> Result<u64, CoreError>;
    fn load(&self, id: Uuid) -> Result<Versioned<Budget>, CoreError>;
    /// Writes `budget` only if the stored revision equals `expected_revision`.
    /// Returns the new revision.
    fn compare_and_swap(&self, budget: &Budget, expected_revision: u64) -> Result<u64, CoreError>;
    fn list_for_user(&self, user: &str) -> Result<Vec<Versioned<Budget>>, CoreError>;

    /// Finds the annual budget a user set up for `year`.
    fn find_annual(&self, user: &str, year: i32) -> Result<Option<Versioned<Budget>>, CoreError> {
        Ok(self
            .list_for_user(user)?
            .into_iter()
            .find(|entry| {
                entry.value.period.kind == PeriodKind::Annual && entry.value.period.year() == year
            }))
    }
}

/// Process-local store used by tests and embedders without durable storage.
#[derive(Debug, Default)]
pub struct InMemoryBudgetStore {
    budgets: RwLock<HashMap<Uuid, Versioned<Budget>>>,
}

impl InMemoryBudgetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> CoreError {
    CoreError::Storage("budget store lock poisoned".into())
}

/// Whether `candidate` occupies the same annual (user, year) slot as `budget`.
pub fn same_annual_slot(budget: &Budget, candidate: &Budget) -> bool {
    budget.period.kind == PeriodKind::Annual
        && candidate.period.kind == PeriodKind::Annual
        && candidate.user == budget.user
        && candidate.period.year() == budget.period.year()
}

/// Error returned by [`BudgetStore::insert`] when the annual slot is taken.
pub fn annual_slot_taken(existing: &Versioned<Budget>) -> CoreError {
    CoreError::Conflict {
        budget_id: existing.value.id,
        expected: 0,
        found: existing.revision,
    }
}

impl BudgetStore for InMemoryBudgetStore {
    fn insert(&self, budget: &Budget) -> Result<u64, CoreError> {
        let mut guard = self.budgets.write().map_err(|_| poisoned())?;
        if guard.contains_key(&budget.id) {
            return Err(CoreError::Validation(format!(
                "budget {} already exists",
                budget.id
            )));
        }
        if let Some(existing) = guard
            .values()
            .find(|entry| same_annual_slot(budget, &entry.value))
        {
            return Err(annual_slot_taken(existing));
        }
        guard.insert(
            budget.id,
            Versioned {
                revision: 1,
                value: budget.clone(),
            },
        );
        Ok(1)
    }

    fn load(&self, id: Uuid) -> Result<Versioned<Budget>, CoreError> {
        let guard = self.budgets.read().map_err(|_| poisoned())?;
        guard
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("budget {id}")))
    }

    fn compare_and_swap(&self, budget: &Budget, expected_revision: u64) -> Result<u64, CoreError> {
        let mut guard = self.budgets.write().map_err(|_| poisoned())?;
        let entry = guard
            .get_mut(&budget.id)
            .ok_or_else(|| CoreError::NotFound(format!("budget {}", budget.id)))?;
        if entry.revision != expected_revision {
            return Err(CoreError::Conflict {
                budget_id: budget.id,
                expected: expected_revision,
                found: entry.revision,
            });
        }
        entry.revision += 1;
        entry.value = budget.clone();
        Ok(entry.revision)
    }

    fn list_for_user(&self, user: &str) -> Result<Vec<Versioned<Budget>>, CoreError> {
        let guard = self.budgets.read().map_err(|_| poisoned())?;
        let mut entries: Vec<_> = guard
            .values()
            .filter(|entry| entry.value.user == user)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.value.period.start_date, entry.value.created_at));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_domain::{BudgetPeriod, Money};

    fn budget(user: &str, year: i32) -> Budget {
        Budget::new(user, BudgetPeriod::annual(year).unwrap(), Money::usd(100.0))
    }

    #[test]
    fn compare_and_swap_rejects_stale_revision() {
        let store = InMemoryBudgetStore::new();
        let mut value = budget("ana", 2024);
        store.insert(&value).unwrap();

        value.total_budget.amount = 200.0;
        assert_eq!(store.compare_and_swap(&value, 1).unwrap(), 2);

        let err = store.compare_and_swap(&value, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert_eq!(store.load(value.id).unwrap().value.total_budget.amount, 200.0);
    }

    #[test]
    fn find_annual_matches_user_and_year() {
        let store = InMemoryBudgetStore::new();
        store.insert(&budget("ana", 2023)).unwrap();
        let current = budget("ana", 2024);
        store.insert(&current).unwrap();
        store.insert(&budget("ben", 2024)).unwrap();

        let found = store.find_annual("ana", 2024).unwrap().unwrap();
        assert_eq!(found.value.id, current.id);
        assert!(store.find_annual("ana", 2022).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = InMemoryBudgetStore::new();
        let value = budget("ana", 2024);
        store.insert(&value).unwrap();
        assert!(matches!(store.insert(&value), Err(CoreError::Validation(_))));
    }

    #[test]
    fn second_annual_budget_for_the_same_year_conflicts() {
        let store = InMemoryBudgetStore::new();
        let first = budget("ana", 2024);
        store.insert(&first).unwrap();

        let err = store.insert(&budget("ana", 2024)).unwrap_err();
        match err {
            CoreError::Conflict {
                budget_id,
                expected,
                found,
            } => {
                assert_eq!(budget_id, first.id);
                assert_eq!((expected, found), (0, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.list_for_user("ana").unwrap().len(), 1);
        store.insert(&budget("ana", 2025)).unwrap();
    }
}

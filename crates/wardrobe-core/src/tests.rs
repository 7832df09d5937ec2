use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier,
};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    aggregation_service::BudgetAggregator,
    budget_service::{BudgetRequest, BudgetService, ServiceSettings},
    catalog::{InMemoryCatalog, PurchaseCatalog},
    report_service::{ReportFormat, ReportScope},
    storage::{BudgetStore, InMemoryBudgetStore, Versioned},
    time::FixedClock,
    CoreError,
};
use wardrobe_domain::{
    AlertLevel, Budget, BudgetStatus, DateRange, ItemFamily, NewTransaction, PurchaseRecord,
    SpendCategory, StyleCombo,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service_over(store: Arc<dyn BudgetStore>) -> BudgetService {
    BudgetService::new(
        store,
        Arc::new(InMemoryCatalog::new()),
        Arc::new(FixedClock::on(date(2024, 4, 10))),
    )
}

fn purchase(amount: f64, category: &str) -> NewTransaction {
    NewTransaction::new("sku", "womenswear", amount, category, date(2024, 4, 1))
}

#[test]
fn every_append_keeps_totals_consistent() {
    let service = service_over(Arc::new(InMemoryBudgetStore::new()));
    let budget = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 1000.0))
        .expect("create budget");

    let appends = [
        (12.5, "menswear"),
        (40.0, "womenswear"),
        (7.25, "accessories"),
        (0.0, "footwear"),
        (99.0, "kidswear"),
        (3.0, "menswear"),
    ];
    let mut expected = 0.0;
    for (amount, category) in appends {
        expected += amount;
        let next = service
            .record_transaction(budget.id, &purchase(amount, category))
            .expect("append");
        assert_eq!(next.spending.total_spent, expected);
        let per_category: f64 = next.category_budgets.values().map(|entry| entry.spent).sum();
        assert_eq!(per_category, next.spending.total_spent);
        assert_eq!(
            next.spending.remaining_budget,
            next.total_budget.amount - next.spending.total_spent
        );
        assert_eq!(BudgetAggregator::recompute(&next), next);
    }
    assert_eq!(service.get_budget(budget.id).unwrap().transaction_count(), appends.len());
}

#[test]
fn warning_then_danger_fire_once_each() {
    let service = service_over(Arc::new(InMemoryBudgetStore::new()));
    let budget = service
        .create_or_update_budget(
            &BudgetRequest::new("ana", 2024, 1000.0).with_alert_threshold(75.0),
        )
        .expect("create budget");

    let after_warning = service
        .record_transaction(budget.id, &purchase(500.0, "womenswear"))
        .and_then(|_| service.record_transaction(budget.id, &purchase(250.0, "footwear")))
        .expect("append to 750");
    let levels: Vec<_> = after_warning
        .alerts
        .notifications
        .iter()
        .map(|n| n.level)
        .collect();
    assert_eq!(levels, vec![AlertLevel::Warning]);

    let after_danger = service
        .record_transaction(budget.id, &purchase(170.0, "womenswear"))
        .expect("append to 920");
    let levels: Vec<_> = after_danger
        .alerts
        .notifications
        .iter()
        .map(|n| n.level)
        .collect();
    assert_eq!(levels, vec![AlertLevel::Warning, AlertLevel::Danger]);

    let refreshed = service.refresh_budget(budget.id).expect("refresh");
    assert_eq!(refreshed.alerts.notifications.len(), 2);
}

#[test]
fn concurrent_appends_are_not_lost() {
    let store: Arc<dyn BudgetStore> = Arc::new(InMemoryBudgetStore::new());
    let service = Arc::new(service_over(store));
    let budget = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 100.0))
        .expect("create budget");

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [10.0, 20.0]
        .into_iter()
        .map(|amount| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                service.record_transaction(budget.id, &purchase(amount, "menswear"))
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("append");
    }

    let stored = service.get_budget(budget.id).expect("load");
    assert_eq!(stored.spending.total_spent, 30.0);
    assert_eq!(stored.transactions.len(), 2);
}

/// Store whose writes conflict a fixed number of times before succeeding.
struct FlakyStore {
    inner: InMemoryBudgetStore,
    conflicts_left: AtomicUsize,
}

impl BudgetStore for FlakyStore {
    fn insert(&self, budget: &Budget) -> Result<u64, CoreError> {
        self.inner.insert(budget)
    }

    fn load(&self, id: Uuid) -> Result<Versioned<Budget>, CoreError> {
        self.inner.load(id)
    }

    fn compare_and_swap(&self, budget: &Budget, expected_revision: u64) -> Result<u64, CoreError> {
        let left = self.conflicts_left.load(Ordering::SeqCst);
        if left > 0 {
            self.conflicts_left.store(left - 1, Ordering::SeqCst);
            return Err(CoreError::Conflict {
                budget_id: budget.id,
                expected: expected_revision,
                found: expected_revision + 1,
            });
        }
        self.inner.compare_and_swap(budget, expected_revision)
    }

    fn list_for_user(&self, user: &str) -> Result<Vec<Versioned<Budget>>, CoreError> {
        self.inner.list_for_user(user)
    }
}

#[test]
fn conflicts_are_retried_then_surfaced() {
    let store = Arc::new(FlakyStore {
        inner: InMemoryBudgetStore::new(),
        conflicts_left: AtomicUsize::new(0),
    });
    let service = BudgetService::with_settings(
        store.clone(),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(FixedClock::on(date(2024, 4, 10))),
        ServiceSettings {
            max_append_retries: 2,
            ..ServiceSettings::default()
        },
    );
    let budget = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 100.0))
        .expect("create budget");

    store.conflicts_left.store(2, Ordering::SeqCst);
    let next = service
        .record_transaction(budget.id, &purchase(5.0, "menswear"))
        .expect("succeeds on the third attempt");
    assert_eq!(next.spending.total_spent, 5.0);

    store.conflicts_left.store(3, Ordering::SeqCst);
    let err = service
        .record_transaction(budget.id, &purchase(5.0, "menswear"))
        .expect_err("retries exhausted");
    assert!(err.is_conflict());
    assert_eq!(service.get_budget(budget.id).unwrap().spending.total_spent, 5.0);
}

/// Store whose budget listing is slow, widening the gap between the lookup
/// and the insert of a create.
struct SlowListingStore {
    inner: InMemoryBudgetStore,
}

impl BudgetStore for SlowListingStore {
    fn insert(&self, budget: &Budget) -> Result<u64, CoreError> {
        self.inner.insert(budget)
    }

    fn load(&self, id: Uuid) -> Result<Versioned<Budget>, CoreError> {
        self.inner.load(id)
    }

    fn compare_and_swap(&self, budget: &Budget, expected_revision: u64) -> Result<u64, CoreError> {
        self.inner.compare_and_swap(budget, expected_revision)
    }

    fn list_for_user(&self, user: &str) -> Result<Vec<Versioned<Budget>>, CoreError> {
        std::thread::sleep(std::time::Duration::from_millis(20));
        self.inner.list_for_user(user)
    }
}

#[test]
fn concurrent_creates_share_one_annual_budget() {
    let store: Arc<dyn BudgetStore> = Arc::new(SlowListingStore {
        inner: InMemoryBudgetStore::new(),
    });
    let service = Arc::new(service_over(Arc::clone(&store)));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [100.0, 200.0]
        .into_iter()
        .map(|total| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                service.create_or_update_budget(&BudgetRequest::new("ana", 2024, total))
            })
        })
        .collect();
    let ids: Vec<Uuid> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread").expect("create").id)
        .collect();

    assert_eq!(ids[0], ids[1]);
    let stored = store.list_for_user("ana").expect("list");
    assert_eq!(stored.len(), 1);
    assert!([100.0, 200.0].contains(&stored[0].value.total_budget.amount));
}

struct OfflineCatalog;

impl PurchaseCatalog for OfflineCatalog {
    fn purchases(
        &self,
        family: ItemFamily,
        _user: &str,
        _range: &DateRange,
    ) -> Result<Vec<PurchaseRecord>, CoreError> {
        match family {
            ItemFamily::Kidswear => Err(CoreError::Storage("connection refused".into())),
            _ => Ok(Vec::new()),
        }
    }

    fn style_combos(&self, _user: &str, _range: &DateRange) -> Result<Vec<StyleCombo>, CoreError> {
        Ok(Vec::new())
    }
}

#[test]
fn store_outage_fails_the_whole_report() {
    let service = BudgetService::new(
        Arc::new(InMemoryBudgetStore::new()),
        Arc::new(OfflineCatalog),
        Arc::new(FixedClock::on(date(2024, 4, 10))),
    );
    let scope = ReportScope::year("ana", 2024);
    let report = service.generate_spending_report(&scope, ReportFormat::Json);
    assert!(matches!(report, Err(CoreError::Dependency(_))));
    let summary = service.get_spending_summary("ana", 2024, None);
    assert!(matches!(summary, Err(CoreError::Dependency(_))));
}

#[test]
fn status_follows_period_and_spend() {
    let store: Arc<dyn BudgetStore> = Arc::new(InMemoryBudgetStore::new());
    let service = service_over(Arc::clone(&store));
    let budget = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 1000.0))
        .expect("create budget");
    let exceeded = service
        .record_transaction(budget.id, &purchase(1200.0, "footwear"))
        .expect("append");
    assert_eq!(exceeded.status, BudgetStatus::Exceeded);
    assert_eq!(exceeded.category(SpendCategory::Footwear).spent, 1200.0);

    let past = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2023, 1000.0))
        .expect("create past budget");
    let refreshed = service.refresh_budget(past.id).expect("refresh");
    assert_eq!(refreshed.status, BudgetStatus::Completed);
}

#[test]
fn paused_budgets_resume_automatic_handling() {
    let service = service_over(Arc::new(InMemoryBudgetStore::new()));
    let budget = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 10.0))
        .expect("create budget");
    service
        .set_operator_status(budget.id, BudgetStatus::Paused)
        .expect("pause");
    let paused = service
        .record_transaction(budget.id, &purchase(50.0, "menswear"))
        .expect("append while paused");
    assert_eq!(paused.status, BudgetStatus::Paused);

    let resumed = service
        .set_operator_status(budget.id, BudgetStatus::Active)
        .expect("resume");
    assert_eq!(resumed.status, BudgetStatus::Exceeded);
}

#[test]
fn acknowledging_clears_pending_alerts() {
    let service = service_over(Arc::new(InMemoryBudgetStore::new()));
    let budget = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 100.0))
        .expect("create budget");
    service
        .record_transaction(budget.id, &purchase(95.0, "menswear"))
        .expect("append");
    let acknowledged = service.acknowledge_alerts(budget.id).expect("acknowledge");
    assert_eq!(acknowledged.alerts.notifications.len(), 1);
    assert_eq!(acknowledged.unacknowledged_alerts().count(), 0);
}

#[test]
fn missing_budget_is_not_found() {
    let service = service_over(Arc::new(InMemoryBudgetStore::new()));
    assert!(matches!(service.get_budget(Uuid::new_v4()), Err(CoreError::NotFound(_))));
    assert!(matches!(service.find_budget("ana", 2024), Err(CoreError::NotFound(_))));
    assert!(matches!(
        service.record_transaction(Uuid::new_v4(), &purchase(1.0, "menswear")),
        Err(CoreError::NotFound(_))
    ));
}

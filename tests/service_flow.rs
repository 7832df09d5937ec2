mod common;

use wardrobe_budget::domain::{ItemFamily, PurchaseRecord, SpendCategory, StyleCombo};
use wardrobe_budget::engine::{
    BudgetRequest, BudgetStore, InMemoryCatalog, ReportFormat, ReportScope, ServiceSettings,
};

use common::{date, json_service};

fn record(
    family: ItemFamily,
    category: &str,
    brand: &str,
    price: f64,
    month: u32,
) -> PurchaseRecord {
    PurchaseRecord {
        id: format!("{family}-{category}-{month}"),
        user: "ana".into(),
        family,
        category: category.into(),
        brand: brand.into(),
        final_price: price,
        purchase_date: date(2024, month, 12),
        age_group: None,
        times_worn: 0,
    }
}

fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_purchase(record(ItemFamily::Menswear, "shirt", "Uniqlo", 60.0, 1)).unwrap();
    catalog.add_purchase(record(ItemFamily::Womenswear, "dress", "Zara", 90.0, 3)).unwrap();
    catalog.add_purchase(record(ItemFamily::Womenswear, "Accessories", "Zara", 30.0, 3)).unwrap();
    catalog.add_purchase(record(ItemFamily::Kidswear, "footwear", "Gap", 20.0, 3)).unwrap();
    catalog.add_combo(StyleCombo {
        id: "combo-1".into(),
        user: "ana".into(),
        event_tag: Some("Wedding".into()),
        created_at: date(2024, 3, 14),
        total_price: 120.0,
        items: Default::default(),
    });
    catalog
}

#[test]
fn monthly_summary_compares_against_a_twelfth_of_the_budget() {
    let (service, _store) = json_service(catalog(), ServiceSettings::default());
    service
        .create_or_update_budget(
            &BudgetRequest::new("ana", 2024, 1200.0).with_allocation("womenswear", 600.0),
        )
        .expect("create budget");

    let summary = service
        .get_spending_summary("ana", 2024, Some(3))
        .expect("summary");
    assert_eq!(summary.total_spending, 140.0);
    assert_eq!(summary.spending_by_category.len(), SpendCategory::ALL.len());
    assert_eq!(summary.spending_by_category[&SpendCategory::Womenswear], 90.0);
    assert_eq!(summary.spending_by_category[&SpendCategory::Accessories], 30.0);
    assert_eq!(summary.spending_by_category[&SpendCategory::Footwear], 20.0);
    assert_eq!(summary.spending_by_category[&SpendCategory::Menswear], 0.0);

    let womenswear = summary
        .budget_comparison
        .iter()
        .find(|row| row.category == SpendCategory::Womenswear)
        .expect("womenswear row");
    assert_eq!(womenswear.allocated, 50.0);
    assert_eq!(womenswear.remaining, -40.0);
    assert!(summary
        .alerts
        .iter()
        .any(|alert| alert.category == Some(SpendCategory::Womenswear)));
    assert!(summary.alerts.iter().any(|alert| alert.category.is_none()));
}

#[test]
fn reports_follow_the_zero_fill_setting() {
    let scope = ReportScope::year("ana", 2024);

    let (filled, _store) = json_service(catalog(), ServiceSettings::default());
    let report = filled
        .generate_spending_report(&scope, ReportFormat::Pdf)
        .expect("report");
    assert_eq!(report.monthly.len(), 12);
    assert_eq!(report.overview.total_spending, 200.0);
    assert_eq!(report.overview.total_items, 4);
    assert_eq!(report.brands.brands[0].brand, "Zara");
    assert_eq!(report.events.events[0].combo_count, 1);

    let (sparse, _store) = json_service(
        catalog(),
        ServiceSettings {
            zero_fill_monthly: false,
            ..ServiceSettings::default()
        },
    );
    let report = sparse
        .generate_spending_report(&scope, ReportFormat::Json)
        .expect("report");
    let months: Vec<u32> = report.monthly.iter().map(|entry| entry.month).collect();
    assert_eq!(months, vec![1, 3]);
}

#[test]
fn updates_rewrite_the_stored_document() {
    let (service, store) = json_service(InMemoryCatalog::new(), ServiceSettings::default());
    let created = service
        .create_or_update_budget(&BudgetRequest::new("ana", 2024, 500.0))
        .expect("create budget");
    let updated = service
        .create_or_update_budget(
            &BudgetRequest::new("ana", 2024, 800.0).with_allocation("footwear", 100.0),
        )
        .expect("update budget");

    assert_eq!(updated.id, created.id);
    let stored = store.load(created.id).expect("load");
    assert_eq!(stored.revision, 2);
    assert_eq!(stored.value.total_budget.amount, 800.0);
    assert_eq!(stored.value.category(SpendCategory::Footwear).allocated, 100.0);
    assert_eq!(store.list_revisions(created.id).expect("history"), vec![1]);
}

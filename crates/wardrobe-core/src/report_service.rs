//! Spending reports built by fanning out over the item-family stores.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use wardrobe_domain::{DateRange, PurchaseRecord, StyleCombo};

use crate::{
    catalog::{collect_purchases, collect_style_combos, PurchaseCatalog},
    CoreError,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Pdf,
    Excel,
}

impl FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "pdf" => Ok(ReportFormat::Pdf),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            other => Err(CoreError::Validation(format!("unknown report format `{other}`"))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportFormat::Json => "json",
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "excel",
        };
        f.pad(label)
    }
}

/// Who and what a report covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportScope {
    pub user: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl ReportScope {
    pub fn year(user: impl Into<String>, year: i32) -> Self {
        Self {
            user: user.into(),
            year,
            ..Self::default()
        }
    }

    pub fn date_range(&self) -> Result<DateRange, CoreError> {
        let range = match self.month {
            Some(month) => DateRange::for_month(self.year, month),
            None => DateRange::for_year(self.year),
        };
        range.ok_or_else(|| {
            CoreError::Validation(format!(
                "invalid report scope {}-{}",
                self.year,
                self.month.map(|m| m.to_string()).unwrap_or_else(|| "*".into())
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReportEntry {
    pub category: String,
    pub total_spent: f64,
    pub item_count: usize,
    pub average_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandTotal {
    pub brand: String,
    pub total_spent: f64,
    pub item_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub brands: Vec<BrandTotal>,
    pub total_spent: f64,
    pub item_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventReportEntry {
    pub event: String,
    pub combo_count: usize,
    pub total_spent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub events: Vec<EventReportEntry>,
    pub total_spent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEntry {
    pub month: u32,
    pub total: f64,
    pub item_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportOverview {
    pub total_spending: f64,
    pub total_items: usize,
    pub average_per_item: f64,
    /// Always divides by 12, whatever the scope.
    pub average_per_month: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingReport {
    pub scope: ReportScope,
    pub format: ReportFormat,
    pub generated_at: DateTime<Utc>,
    pub overview: ReportOverview,
    pub categories: Vec<CategoryReportEntry>,
    pub brands: BrandReport,
    pub events: EventReport,
    pub monthly: Vec<MonthlyEntry>,
}

impl SpendingReport {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds reports from one consistent read of every store.
pub struct ReportGenerator<'a> {
    catalog: &'a dyn PurchaseCatalog,
    zero_fill_months: bool,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(catalog: &'a dyn PurchaseCatalog) -> Self {
        Self {
            catalog,
            zero_fill_months: true,
        }
    }

    pub fn with_zero_fill(mut self, zero_fill_months: bool) -> Self {
        self.zero_fill_months = zero_fill_months;
        self
    }

    pub fn generate(
        &self,
        scope: &ReportScope,
        format: ReportFormat,
        generated_at: DateTime<Utc>,
    ) -> Result<SpendingReport, CoreError> {
        let range = scope.date_range()?;
        let purchases = collect_purchases(self.catalog, &scope.user, &range)?;
        let combos = collect_style_combos(self.catalog, &scope.user, &range)?;

        let report = SpendingReport {
            scope: scope.clone(),
            format,
            generated_at,
            overview: overview(&purchases),
            categories: category_report(&purchases),
            brands: brand_report(&purchases, scope.brand.as_deref()),
            events: event_report(&combos, scope.event.as_deref()),
            monthly: monthly_breakdown(&purchases, scope.month, self.zero_fill_months),
        };
        info!(
            user = %scope.user,
            year = scope.year,
            items = report.overview.total_items,
            total = report.overview.total_spending,
            "spending report generated"
        );
        Ok(report)
    }

    pub fn category_report(
        &self,
        scope: &ReportScope,
    ) -> Result<Vec<CategoryReportEntry>, CoreError> {
        let purchases = collect_purchases(self.catalog, &scope.user, &scope.date_range()?)?;
        Ok(category_report(&purchases))
    }

    pub fn brand_report(&self, scope: &ReportScope) -> Result<BrandReport, CoreError> {
        let purchases = collect_purchases(self.catalog, &scope.user, &scope.date_range()?)?;
        Ok(brand_report(&purchases, scope.brand.as_deref()))
    }

    pub fn event_report(&self, scope: &ReportScope) -> Result<EventReport, CoreError> {
        let combos = collect_style_combos(self.catalog, &scope.user, &scope.date_range()?)?;
        Ok(event_report(&combos, scope.event.as_deref()))
    }

    pub fn monthly_breakdown(&self, scope: &ReportScope) -> Result<Vec<MonthlyEntry>, CoreError> {
        let purchases = collect_purchases(self.catalog, &scope.user, &scope.date_range()?)?;
        Ok(monthly_breakdown(&purchases, scope.month, self.zero_fill_months))
    }
}

pub fn overview(purchases: &[PurchaseRecord]) -> ReportOverview {
    let total_spending: f64 = purchases.iter().map(|record| record.final_price).sum();
    let total_items = purchases.len();
    ReportOverview {
        total_spending,
        total_items,
        average_per_item: if total_items == 0 {
            0.0
        } else {
            total_spending / total_items as f64
        },
        average_per_month: total_spending / 12.0,
    }
}

pub fn category_report(purchases: &[PurchaseRecord]) -> Vec<CategoryReportEntry> {
    let mut grouped: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for record in purchases {
        let entry = grouped
            .entry(record.category.trim().to_lowercase())
            .or_insert((0.0, 0));
        entry.0 += record.final_price;
        entry.1 += 1;
    }
    let mut entries: Vec<CategoryReportEntry> = grouped
        .into_iter()
        .map(|(category, (total_spent, item_count))| CategoryReportEntry {
            category,
            total_spent,
            item_count,
            average_price: total_spent / item_count as f64,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| a.category.cmp(&b.category))
    });
    entries
}

pub fn brand_report(purchases: &[PurchaseRecord], filter: Option<&str>) -> BrandReport {
    let needle = filter
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());
    let mut grouped: BTreeMap<String, BrandTotal> = BTreeMap::new();
    for record in purchases {
        let brand = record.brand.trim();
        let key = brand.to_lowercase();
        if let Some(needle) = needle.as_deref() {
            if !key.contains(needle) {
                continue;
            }
        }
        let entry = grouped.entry(key).or_insert_with(|| BrandTotal {
            brand: brand.to_string(),
            total_spent: 0.0,
            item_count: 0,
        });
        entry.total_spent += record.final_price;
        entry.item_count += 1;
    }
    let mut brands: Vec<BrandTotal> = grouped.into_values().collect();
    brands.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| a.brand.cmp(&b.brand))
    });
    BrandReport {
        filter: needle,
        total_spent: brands.iter().map(|entry| entry.total_spent).sum(),
        item_count: brands.iter().map(|entry| entry.item_count).sum(),
        brands,
    }
}

pub fn event_report(combos: &[StyleCombo], filter: Option<&str>) -> EventReport {
    let wanted = filter
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());
    let mut grouped: BTreeMap<String, EventReportEntry> = BTreeMap::new();
    for combo in combos {
        let Some(tag) = combo.event_tag.as_deref().map(str::trim).filter(|tag| !tag.is_empty())
        else {
            continue;
        };
        let key = tag.to_lowercase();
        if wanted.as_deref().is_some_and(|wanted| wanted != key) {
            continue;
        }
        let entry = grouped.entry(key).or_insert_with(|| EventReportEntry {
            event: tag.to_string(),
            combo_count: 0,
            total_spent: 0.0,
        });
        entry.combo_count += 1;
        entry.total_spent += combo.total_price;
    }
    let events: Vec<EventReportEntry> = grouped.into_values().collect();
    EventReport {
        filter: wanted,
        total_spent: events.iter().map(|entry| entry.total_spent).sum(),
        events,
    }
}

/// Per-month totals sorted by month. With `zero_fill`, every month of the
/// scope is present even without purchases.
pub fn monthly_breakdown(
    purchases: &[PurchaseRecord],
    only_month: Option<u32>,
    zero_fill: bool,
) -> Vec<MonthlyEntry> {
    let mut months: BTreeMap<u32, MonthlyEntry> = BTreeMap::new();
    if zero_fill {
        let scope: Vec<u32> = match only_month {
            Some(month) => vec![month],
            None => (1..=12).collect(),
        };
        for month in scope {
            months.insert(
                month,
                MonthlyEntry {
                    month,
                    total: 0.0,
                    item_count: 0,
                },
            );
        }
    }
    for record in purchases {
        let month = record.purchase_date.month();
        if only_month.is_some_and(|wanted| wanted != month) {
            continue;
        }
        let entry = months.entry(month).or_insert(MonthlyEntry {
            month,
            total: 0.0,
            item_count: 0,
        });
        entry.total += record.final_price;
        entry.item_count += 1;
    }
    months.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use chrono::NaiveDate;
    use wardrobe_domain::{ComboItems, ItemFamily};

    fn purchase(
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
            purchase_date: NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            age_group: None,
            times_worn: 0,
        }
    }

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_purchase(purchase(ItemFamily::Menswear, "Shirts", "Uniqlo", 30.0, 1)).unwrap();
        catalog.add_purchase(purchase(ItemFamily::Womenswear, "shirts", "Zara", 50.0, 1)).unwrap();
        catalog.add_purchase(purchase(ItemFamily::Kidswear, "Coats", "uniqlo", 40.0, 3)).unwrap();
        catalog.add_combo(StyleCombo {
            id: "c1".into(),
            user: "ana".into(),
            event_tag: Some("Wedding".into()),
            created_at: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            total_price: 210.0,
            items: ComboItems::default(),
        });
        catalog
    }

    #[test]
    fn category_report_merges_across_stores() {
        let catalog = catalog();
        let generator = ReportGenerator::new(&catalog);
        let entries = generator.category_report(&ReportScope::year("ana", 2024)).unwrap();
        assert_eq!(entries[0].category, "shirts");
        assert_eq!(entries[0].item_count, 2);
        assert_eq!(entries[0].total_spent, 80.0);
        assert_eq!(entries[0].average_price, 40.0);
    }

    #[test]
    fn brand_filter_is_case_insensitive_substring() {
        let catalog = catalog();
        let mut scope = ReportScope::year("ana", 2024);
        scope.brand = Some("NIQ".into());
        let report = ReportGenerator::new(&catalog).brand_report(&scope).unwrap();
        assert_eq!(report.brands.len(), 1);
        assert_eq!(report.total_spent, 70.0);
        assert_eq!(report.item_count, 2);
    }

    #[test]
    fn monthly_breakdown_zero_fills_every_month() {
        let catalog = catalog();
        let months = ReportGenerator::new(&catalog)
            .monthly_breakdown(&ReportScope::year("ana", 2024))
            .unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].total, 80.0);
        assert_eq!(months[1].total, 0.0);
        assert_eq!(months[2].item_count, 1);
    }

    #[test]
    fn monthly_breakdown_can_omit_empty_months() {
        let catalog = catalog();
        let months = ReportGenerator::new(&catalog)
            .with_zero_fill(false)
            .monthly_breakdown(&ReportScope::year("ana", 2024))
            .unwrap();
        let listed: Vec<u32> = months.iter().map(|entry| entry.month).collect();
        assert_eq!(listed, vec![1, 3]);
    }

    #[test]
    fn overview_divides_by_twelve_and_handles_no_items() {
        let empty = overview(&[]);
        assert_eq!(empty.average_per_item, 0.0);
        assert_eq!(empty.average_per_month, 0.0);

        let catalog = catalog();
        let report = ReportGenerator::new(&catalog)
            .generate(&ReportScope::year("ana", 2024), ReportFormat::Json, Utc::now())
            .unwrap();
        assert_eq!(report.overview.total_spending, 120.0);
        assert_eq!(report.overview.average_per_item, 40.0);
        assert_eq!(report.overview.average_per_month, 10.0);
        assert_eq!(report.events.total_spent, 210.0);
    }

    #[test]
    fn event_filter_matches_tag() {
        let catalog = catalog();
        let mut scope = ReportScope::year("ana", 2024);
        scope.event = Some("gala".into());
        let report = ReportGenerator::new(&catalog).event_report(&scope).unwrap();
        assert!(report.events.is_empty());
        scope.event = Some("wedding".into());
        let report = ReportGenerator::new(&catalog).event_report(&scope).unwrap();
        assert_eq!(report.events[0].combo_count, 1);
    }

    #[test]
    fn report_format_parses_labels() {
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert!("csv".parse::<ReportFormat>().is_err());
    }
}

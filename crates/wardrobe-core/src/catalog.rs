//! Read access to the external item-family and outfit stores.

use serde::{Deserialize, Serialize};
use tracing::error;

use wardrobe_domain::{DateRange, ItemFamily, PurchaseRecord, StyleCombo};

use crate::CoreError;

/// Read-only view over the menswear/womenswear/kidswear stores and the outfit store.
///
/// Implementations report outages as [`CoreError::Dependency`].
pub trait PurchaseCatalog: Send + Sync {
    fn purchases(
        &self,
        family: ItemFamily,
        user: &str,
        range: &DateRange,
    ) -> Result<Vec<PurchaseRecord>, CoreError>;

    fn style_combos(&self, user: &str, range: &DateRange) -> Result<Vec<StyleCombo>, CoreError>;
}

/// Queries every item-family store and merges the results.
///
/// Any store failure aborts the whole fan-out; callers never see a partial set.
pub fn collect_purchases(
    catalog: &dyn PurchaseCatalog,
    user: &str,
    range: &DateRange,
) -> Result<Vec<PurchaseRecord>, CoreError> {
    let mut merged = Vec::new();
    for family in ItemFamily::ALL {
        let records = catalog
            .purchases(family, user, range)
            .map_err(|err| dependency_failure(family.as_str(), err))?;
        merged.extend(records);
    }
    Ok(merged)
}

pub fn collect_style_combos(
    catalog: &dyn PurchaseCatalog,
    user: &str,
    range: &DateRange,
) -> Result<Vec<StyleCombo>, CoreError> {
    catalog
        .style_combos(user, range)
        .map_err(|err| dependency_failure("stylecombo", err))
}

fn dependency_failure(store: &str, err: CoreError) -> CoreError {
    error!(store, error = %err, "purchase store read failed");
    match err {
        CoreError::Dependency(message) => CoreError::Dependency(message),
        other => CoreError::Dependency(format!("{store} store: {other}")),
    }
}

/// Store records carry a finite, non-negative final price.
fn check_purchase(record: &PurchaseRecord) -> Result<(), CoreError> {
    if record.final_price.is_finite() && record.final_price >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "purchase {} has an invalid final price {}",
            record.id, record.final_price
        )))
    }
}

/// Catalog held entirely in memory, e.g. loaded from a JSON export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    pub purchases: Vec<PurchaseRecord>,
    #[serde(default)]
    pub combos: Vec<StyleCombo>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an export and rejects it whole when any purchase is invalid.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.purchases.iter().try_for_each(check_purchase)?;
        Ok(catalog)
    }

    pub fn add_purchase(&mut self, record: PurchaseRecord) -> Result<(), CoreError> {
        check_purchase(&record)?;
        self.purchases.push(record);
        Ok(())
    }

    pub fn add_combo(&mut self, combo: StyleCombo) {
        self.combos.push(combo);
    }
}

impl PurchaseCatalog for InMemoryCatalog {
    fn purchases(
        &self,
        family: ItemFamily,
        user: &str,
        range: &DateRange,
    ) -> Result<Vec<PurchaseRecord>, CoreError> {
        Ok(self
            .purchases
            .iter()
            .filter(|record| {
                record.family == family
                    && record.user == user
                    && range.contains(record.purchase_date)
            })
            .cloned()
            .collect())
    }

    fn style_combos(&self, user: &str, range: &DateRange) -> Result<Vec<StyleCombo>, CoreError> {
        Ok(self
            .combos
            .iter()
            .filter(|combo| combo.user == user && range.contains(combo.created_at))
            .cloned()
            .collect())
    }
}

//! Records read from the external item-family and outfit stores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::{ItemFamily, SpendCategory};

/// One purchased item as stored by the menswear, womenswear or kidswear store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: String,
    pub user: String,
    pub family: ItemFamily,
    pub category: String,
    pub brand: String,
    pub final_price: f64,
    pub purchase_date: NaiveDate,
    /// Only populated by the kidswear store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(default)]
    pub times_worn: u32,
}

impl PurchaseRecord {
    /// Budget bucket this item counts against. Items whose own category is
    /// `accessories` or `footwear` land there; everything else follows the
    /// store it came from.
    pub fn spend_category(&self) -> SpendCategory {
        match self.category.parse::<SpendCategory>() {
            Ok(category @ (SpendCategory::Accessories | SpendCategory::Footwear)) => category,
            _ => self.family.category(),
        }
    }

    pub fn cost_per_wear(&self) -> Option<f64> {
        if self.times_worn == 0 {
            None
        } else {
            Some(self.final_price / f64::from(self.times_worn))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComboItems {
    #[serde(default)]
    pub menswear: Vec<String>,
    #[serde(default)]
    pub womenswear: Vec<String>,
    #[serde(default)]
    pub kidswear: Vec<String>,
}

impl ComboItems {
    pub fn len(&self) -> usize {
        self.menswear.len() + self.womenswear.len() + self.kidswear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An outfit assembled from items across the three stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleCombo {
    pub id: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_tag: Option<String>,
    pub created_at: NaiveDate,
    pub total_price: f64,
    #[serde(default)]
    pub items: ComboItems,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, family: ItemFamily, price: f64, worn: u32) -> PurchaseRecord {
        PurchaseRecord {
            id: "p1".into(),
            user: "ana".into(),
            family,
            category: category.into(),
            brand: "Acme".into(),
            final_price: price,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            age_group: None,
            times_worn: worn,
        }
    }

    #[test]
    fn footwear_items_count_against_footwear() {
        assert_eq!(
            record("Footwear", ItemFamily::Womenswear, 80.0, 0).spend_category(),
            SpendCategory::Footwear
        );
        assert_eq!(
            record("shirts", ItemFamily::Kidswear, 20.0, 0).spend_category(),
            SpendCategory::Kidswear
        );
    }

    #[test]
    fn cost_per_wear_is_derived() {
        assert_eq!(record("coats", ItemFamily::Menswear, 120.0, 4).cost_per_wear(), Some(30.0));
        assert_eq!(record("coats", ItemFamily::Menswear, 120.0, 0).cost_per_wear(), None);
    }
}

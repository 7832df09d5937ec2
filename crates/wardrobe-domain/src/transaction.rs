use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{ItemFamily, SpendCategory};

/// A recorded purchase contributing to a budget's spend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub item_id: String,
    pub item_type: ItemFamily,
    pub amount: f64,
    pub category: SpendCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Unvalidated purchase event as it arrives from a caller.
///
/// Category and item type are kept as raw labels; the ledger rejects values
/// outside the fixed sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub item_id: String,
    pub item_type: String,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn new(
        item_id: impl Into<String>,
        item_type: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            item_type: item_type.into(),
            amount,
            category: category.into(),
            brand: None,
            occasion: None,
            date,
            store: None,
            notes: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }
}

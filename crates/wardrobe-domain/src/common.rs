//! Shared enums, money and calendar primitives used across the budget model.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Three ASCII letters, e.g. `USD`.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|ch| ch.is_ascii_uppercase())
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount tagged with its currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Money {
    pub amount: f64,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: f64, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    pub fn usd(amount: f64) -> Self {
        Self::new(amount, CurrencyCode::default())
    }
}

/// Fixed clothing-spend buckets tracked by every budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpendCategory {
    Menswear,
    Womenswear,
    Kidswear,
    Accessories,
    Footwear,
}

impl SpendCategory {
    pub const ALL: [SpendCategory; 5] = [
        SpendCategory::Menswear,
        SpendCategory::Womenswear,
        SpendCategory::Kidswear,
        SpendCategory::Accessories,
        SpendCategory::Footwear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpendCategory::Menswear => "menswear",
            SpendCategory::Womenswear => "womenswear",
            SpendCategory::Kidswear => "kidswear",
            SpendCategory::Accessories => "accessories",
            SpendCategory::Footwear => "footwear",
        }
    }
}

impl fmt::Display for SpendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpendCategory {
    type Err = ParseCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        SpendCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ParseCategoryError(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raised when a category label is not one of the fixed buckets.
pub struct ParseCategoryError(pub String);

impl fmt::Display for ParseCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category `{}`", self.0)
    }
}

impl std::error::Error for ParseCategoryError {}

/// The three external item stores a purchase can originate from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemFamily {
    Menswear,
    Womenswear,
    Kidswear,
}

impl ItemFamily {
    pub const ALL: [ItemFamily; 3] = [
        ItemFamily::Menswear,
        ItemFamily::Womenswear,
        ItemFamily::Kidswear,
    ];

    pub fn category(self) -> SpendCategory {
        match self {
            ItemFamily::Menswear => SpendCategory::Menswear,
            ItemFamily::Womenswear => SpendCategory::Womenswear,
            ItemFamily::Kidswear => SpendCategory::Kidswear,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.category().as_str()
    }
}

impl fmt::Display for ItemFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemFamily {
    type Err = ParseCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ItemFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == normalized)
            .ok_or_else(|| ParseCategoryError(value.trim().to_string()))
    }
}

/// Cadence attached to a budget period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodKind {
    Monthly,
    Quarterly,
    #[default]
    Annual,
    EventBased,
    CategoryBased,
}

/// Bounded, inclusive date range a budget applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: PeriodKind,
}

impl BudgetPeriod {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        kind: PeriodKind,
    ) -> Result<Self, PeriodError> {
        if end_date < start_date {
            return Err(PeriodError::EndBeforeStart);
        }
        Ok(Self {
            start_date,
            end_date,
            kind,
        })
    }

    /// January 1st through December 31st of `year`.
    pub fn annual(year: i32) -> Result<Self, PeriodError> {
        let range = DateRange::for_year(year).ok_or(PeriodError::OutOfRange(year))?;
        Self::new(range.start, range.end, PeriodKind::Annual)
    }

    pub fn year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Number of calendar days covered, counting both ends.
    pub fn total_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when constructing [`BudgetPeriod`] values.
pub enum PeriodError {
    EndBeforeStart,
    OutOfRange(i32),
}

impl fmt::Display for PeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodError::EndBeforeStart => f.write_str("period end must not precede its start"),
            PeriodError::OutOfRange(year) => write!(f, "year {year} is out of range"),
        }
    }
}

impl std::error::Error for PeriodError {}

/// Inclusive date filter used when querying purchase stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn for_year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    pub fn for_month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next.pred_opt()?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

//! wardrobe-core
//!
//! Budget and spending analytics engine for the wardrobe tracker.
//! Depends on wardrobe-domain. No CLI, no terminal I/O; persistence and the
//! external purchase stores are reached through the `BudgetStore` and
//! `PurchaseCatalog` traits.

pub mod error;
pub mod time;
pub mod storage;
pub mod catalog;
pub mod aggregation_service;
pub mod ledger_service;
pub mod alert_service;
pub mod projection_service;
pub mod lifecycle_service;
pub mod report_service;
pub mod planning_service;
pub mod budget_service;

pub use error::{CoreError, CoreResult};
pub use time::{Clock, FixedClock, SystemClock};
pub use storage::{BudgetStore, InMemoryBudgetStore, Versioned};
pub use catalog::{InMemoryCatalog, PurchaseCatalog};
pub use aggregation_service::*;
pub use ledger_service::*;
pub use alert_service::*;
pub use projection_service::*;
pub use lifecycle_service::*;
pub use report_service::*;
pub use planning_service::*;
pub use budget_service::*;

#[cfg(test)]
mod tests;

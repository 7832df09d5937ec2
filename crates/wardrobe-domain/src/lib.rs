//! wardrobe-domain
//!
//! Pure domain models (Budget, Transaction, alerts, purchase records, style combos).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod alert;
pub mod budget;
pub mod common;
pub mod purchase;
pub mod transaction;

pub use alert::*;
pub use budget::*;
pub use common::*;
pub use purchase::*;
pub use transaction::*;

#![doc(test(attr(deny(warnings))))]

//! Wardrobe Budget wires the wardrobe engine crates into a scriptable shell:
//! annual budgets, purchase ledgers, alerts and spending reports.

pub mod cli;
pub mod errors;
pub mod utils;

pub use wardrobe_config as config;
pub use wardrobe_core as engine;
pub use wardrobe_domain as domain;
pub use wardrobe_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Wardrobe Budget tracing initialized.");
    });
}

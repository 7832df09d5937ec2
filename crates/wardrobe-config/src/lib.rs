//! wardrobe-config
//!
//! Persisted engine configuration: thresholds, retry policy, currency and
//! where budgets live on disk. Owns the `EngineConfig` model plus file
//! persistence and backup helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::EngineConfig;

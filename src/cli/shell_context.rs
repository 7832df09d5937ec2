//! Shared runtime state for CLI interactions and command execution.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info};

use wardrobe_config::{ConfigManager, EngineConfig};
use wardrobe_core::{
    BudgetService, Clock, FixedClock, InMemoryCatalog, ServiceSettings, SystemClock,
};
use wardrobe_domain::CurrencyCode;
use wardrobe_storage_json::{JsonBudgetStore, StoragePaths};

use super::{commands, core::parse_date, output, registry::CommandRegistry};
use crate::errors::CliError;

/// Overrides the base directory holding `config/` and, unless configured
/// otherwise, `data/`.
pub const HOME_ENV: &str = "WARDROBE_BUDGET_HOME";
/// Pins "today" to a `YYYY-MM-DD` date.
pub const TODAY_ENV: &str = "WARDROBE_BUDGET_TODAY";
/// Runs the shell over stdin without prompts.
pub const SCRIPT_ENV: &str = "WARDROBE_BUDGET_CLI_SCRIPT";

const APP_DIR: &str = "wardrobe-budget";
const CATALOG_FILE: &str = "catalog.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub config_manager: ConfigManager,
    pub config: EngineConfig,
    pub data_dir: PathBuf,
    pub store: Arc<JsonBudgetStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub clock: Arc<dyn Clock>,
    pub service: BudgetService,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let home = env::var_os(HOME_ENV).map(PathBuf::from);
        let base = home.clone().unwrap_or_else(default_base_dir);
        let config_manager = ConfigManager::with_base_dir(base)?;
        let config = config_manager.load()?;

        let data_dir = match (&config.data_dir, &home) {
            (None, Some(home)) => home.join("data"),
            _ => config.resolve_data_dir(),
        };
        let store = Arc::new(JsonBudgetStore::new(StoragePaths::under(&data_dir))?);
        let catalog = Arc::new(load_catalog(&data_dir.join(CATALOG_FILE))?);
        let clock = clock_from_env()?;

        output::set_preferences(output::OutputPreferences {
            color_enabled: config.ui_color_enabled && mode == CliMode::Interactive,
        });
        let service = build_service(&store, &catalog, &clock, &config);
        info!(data_dir = %data_dir.display(), ?mode, "shell context ready");

        Ok(Self {
            mode,
            registry,
            config_manager,
            config,
            data_dir,
            store,
            catalog,
            clock,
            service,
            last_command: None,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        "wardrobe> ".to_string()
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    /// Swaps in a new catalog and rebuilds the service over it.
    pub fn replace_catalog(&mut self, catalog: InMemoryCatalog) {
        self.catalog = Arc::new(catalog);
        self.rebuild_service();
    }

    /// Swaps in a new configuration and rebuilds the service over it.
    pub fn replace_config(&mut self, config: EngineConfig) {
        self.config = config;
        output::set_preferences(output::OutputPreferences {
            color_enabled: self.config.ui_color_enabled && self.mode == CliMode::Interactive,
        });
        self.rebuild_service();
    }

    fn rebuild_service(&mut self) {
        self.service = build_service(&self.store, &self.catalog, &self.clock, &self.config);
        debug!("budget service rebuilt");
    }
}

pub fn service_settings(config: &EngineConfig) -> ServiceSettings {
    ServiceSettings {
        currency: CurrencyCode::new(config.currency.trim().to_ascii_uppercase()),
        danger_threshold: config.danger_threshold,
        default_alert_threshold: config.default_alert_threshold,
        max_append_retries: config.max_append_retries,
        zero_fill_monthly: config.zero_fill_monthly_report,
    }
}

fn build_service(
    store: &Arc<JsonBudgetStore>,
    catalog: &Arc<InMemoryCatalog>,
    clock: &Arc<dyn Clock>,
    config: &EngineConfig,
) -> BudgetService {
    BudgetService::with_settings(
        store.clone(),
        catalog.clone(),
        Arc::clone(clock),
        service_settings(config),
    )
}

fn default_base_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn load_catalog(path: &Path) -> Result<InMemoryCatalog, CliError> {
    if !path.exists() {
        return Ok(InMemoryCatalog::new());
    }
    let data = fs::read_to_string(path)?;
    Ok(InMemoryCatalog::from_json(&data)?)
}

fn clock_from_env() -> Result<Arc<dyn Clock>, CliError> {
    match env::var(TODAY_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            let today = parse_date(value.trim())
                .map_err(|err| CliError::Input(format!("{TODAY_ENV}: {err}")))?;
            Ok(Arc::new(FixedClock::on(today)))
        }
        _ => Ok(Arc::new(SystemClock)),
    }
}

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use assert_cmd::{assert::Assert, Command};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

use wardrobe_budget::engine::{BudgetService, FixedClock, InMemoryCatalog, ServiceSettings};
use wardrobe_budget::storage::{JsonBudgetStore, StoragePaths};

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh directory used as `WARDROBE_BUDGET_HOME`.
pub fn temp_home() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Runs the CLI in script mode with "today" pinned to 2024-04-10.
pub fn run_script(home: &Path, input: &str) -> Assert {
    Command::cargo_bin("wardrobe_budget_cli")
        .expect("cli binary")
        .env("WARDROBE_BUDGET_CLI_SCRIPT", "1")
        .env("WARDROBE_BUDGET_HOME", home)
        .env("WARDROBE_BUDGET_TODAY", "2024-04-10")
        .env_remove("RUST_LOG")
        .write_stdin(input.to_string())
        .assert()
}

/// Service over a JSON store in a fresh directory.
pub fn json_service(
    catalog: InMemoryCatalog,
    settings: ServiceSettings,
) -> (BudgetService, Arc<JsonBudgetStore>) {
    let store = Arc::new(
        JsonBudgetStore::new(StoragePaths::under(&temp_home())).expect("create json store"),
    );
    let service = BudgetService::with_settings(
        store.clone(),
        Arc::new(catalog),
        Arc::new(FixedClock::on(date(2024, 4, 10))),
        settings,
    );
    (service, store)
}

//! wardrobe-storage-json
//!
//! File-backed [`BudgetStore`]: one JSON document per budget carrying its
//! revision, plus a short history of superseded revisions.
//!
//! Writers coordinate through lock files created with `create_new`, so
//! several processes may share one data directory.

use std::{
    cmp::Reverse,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use wardrobe_core::{
    storage::{annual_slot_taken, same_annual_slot, Versioned},
    BudgetStore, CoreError,
};
use wardrobe_domain::Budget;

const DOCUMENT_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;
const LOCK_EXTENSION: &str = "lock";
const INSERT_LOCK: &str = "insert";
const LOCK_POLL: Duration = Duration::from_millis(5);
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
/// Lock files older than this are left over from a crashed writer.
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub budgets_dir: PathBuf,
    pub history_dir: PathBuf,
    pub locks_dir: PathBuf,
}

impl StoragePaths {
    /// `<root>/budgets`, `<root>/history` and `<root>/locks`.
    pub fn under(root: &Path) -> Self {
        Self {
            budgets_dir: root.join("budgets"),
            history_dir: root.join("history"),
            locks_dir: root.join("locks"),
        }
    }
}

/// Exclusive write lock held as long as its file exists.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(path: PathBuf) -> Result<Self, CoreError> {
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "removing stale lock file");
                        remove_if_present(&path)?;
                        continue;
                    }
                    if started.elapsed() >= LOCK_TIMEOUT {
                        return Err(CoreError::Storage(format!(
                            "timed out waiting for lock {}",
                            path.display()
                        )));
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release lock file");
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef<'a> {
    revision: u64,
    saved_at: DateTime<Utc>,
    budget: &'a Budget,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    revision: u64,
    budget: Budget,
}

/// Budgets stored as `<budgets_dir>/<id>.json`.
///
/// Each revision check and its rename run under `<locks_dir>/<id>.lock`;
/// inserts run under `<locks_dir>/insert.lock` together with the annual
/// slot check. Readers take no lock and only ever see complete documents.
pub struct JsonBudgetStore {
    paths: StoragePaths,
    retention: usize,
}

impl JsonBudgetStore {
    pub fn new(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    /// Keeps at most `retention` superseded revisions per budget (0 disables history).
    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.budgets_dir)?;
        fs::create_dir_all(&paths.history_dir)?;
        fs::create_dir_all(&paths.locks_dir)?;
        Ok(Self { paths, retention })
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn budget_path(&self, id: Uuid) -> PathBuf {
        self.paths
            .budgets_dir
            .join(format!("{id}.{DOCUMENT_EXTENSION}"))
    }

    fn history_dir(&self, id: Uuid) -> PathBuf {
        self.paths.history_dir.join(id.to_string())
    }

    /// Revisions kept in the history for `id`, newest first.
    pub fn list_revisions(&self, id: Uuid) -> Result<Vec<u64>, CoreError> {
        let dir = self.history_dir(id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut revisions = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if let Some(revision) = revision_of(&path) {
                revisions.push(revision);
            }
        }
        revisions.sort_by_key(|revision| Reverse(*revision));
        Ok(revisions)
    }

    pub fn load_revision(&self, id: Uuid, revision: u64) -> Result<Versioned<Budget>, CoreError> {
        let path = self.history_dir(id).join(history_file_name(revision));
        if !path.exists() {
            return Err(CoreError::NotFound(format!("budget {id} revision {revision}")));
        }
        read_document(&path)
    }

    fn lock(&self, name: &str) -> Result<LockFile, CoreError> {
        LockFile::acquire(self.paths.locks_dir.join(format!("{name}.{LOCK_EXTENSION}")))
    }

    fn archive(&self, id: Uuid, current: &Path, revision: u64) -> Result<(), CoreError> {
        if self.retention == 0 {
            return Ok(());
        }
        let dir = self.history_dir(id);
        fs::create_dir_all(&dir)?;
        fs::copy(current, dir.join(history_file_name(revision)))?;
        for stale in self.list_revisions(id)?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(dir.join(history_file_name(stale))) {
                warn!(budget_id = %id, revision = stale, error = %err, "failed to prune history");
            }
        }
        Ok(())
    }
}

impl BudgetStore for JsonBudgetStore {
    fn insert(&self, budget: &Budget) -> Result<u64, CoreError> {
        let _guard = self.lock(INSERT_LOCK)?;
        let path = self.budget_path(budget.id);
        if path.exists() {
            return Err(CoreError::Validation(format!(
                "budget {} already exists",
                budget.id
            )));
        }
        if let Some(existing) = self
            .list_for_user(&budget.user)?
            .iter()
            .find(|entry| same_annual_slot(budget, &entry.value))
        {
            return Err(annual_slot_taken(existing));
        }
        write_document(&path, budget, 1)?;
        debug!(budget_id = %budget.id, path = %path.display(), "budget document created");
        Ok(1)
    }

    fn load(&self, id: Uuid) -> Result<Versioned<Budget>, CoreError> {
        let path = self.budget_path(id);
        if !path.exists() {
            return Err(CoreError::NotFound(format!("budget {id}")));
        }
        read_document(&path)
    }

    fn compare_and_swap(&self, budget: &Budget, expected_revision: u64) -> Result<u64, CoreError> {
        let _guard = self.lock(&budget.id.to_string())?;
        let current = self.load(budget.id)?;
        if current.revision != expected_revision {
            return Err(CoreError::Conflict {
                budget_id: budget.id,
                expected: expected_revision,
                found: current.revision,
            });
        }
        let path = self.budget_path(budget.id);
        self.archive(budget.id, &path, current.revision)?;
        let revision = current.revision + 1;
        write_document(&path, budget, revision)?;
        Ok(revision)
    }

    fn list_for_user(&self, user: &str) -> Result<Vec<Versioned<Budget>>, CoreError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.paths.budgets_dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION)
            {
                continue;
            }
            let document = read_document(&path)?;
            if document.value.user == user {
                entries.push(document);
            }
        }
        entries.sort_by_key(|entry| (entry.value.period.start_date, entry.value.created_at));
        Ok(entries)
    }
}

fn history_file_name(revision: u64) -> String {
    format!("r{revision:08}.{DOCUMENT_EXTENSION}")
}

fn revision_of(path: &Path) -> Option<u64> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
        return None;
    }
    path.file_stem()?.to_str()?.strip_prefix('r')?.parse().ok()
}

fn read_document(path: &Path) -> Result<Versioned<Budget>, CoreError> {
    let data = fs::read_to_string(path)?;
    let document: Document = serde_json::from_str(&data)?;
    Ok(Versioned {
        revision: document.revision,
        value: document.budget,
    })
}

fn write_document(path: &Path, budget: &Budget, revision: u64) -> Result<(), CoreError> {
    let document = DocumentRef {
        revision,
        saved_at: Utc::now(),
        budget,
    };
    let json = serde_json::to_string_pretty(&document)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    tmp.set_extension(format!("{DOCUMENT_EXTENSION}.{TMP_SUFFIX}"));
    tmp
}

fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()
}

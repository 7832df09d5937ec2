use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{ConfigError, EngineConfig};

const CONFIG_FILE: &str = "config.json";
const BACKUP_PREFIX: &str = "engine";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Loads, saves and snapshots [`EngineConfig`] under a base directory:
///
/// ```text
/// <base>/config/config.json
/// <base>/config/backups/engine_<timestamp>[_<note>].json
/// ```
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
        }
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        let backups_dir = config_dir.join("backups");
        fs::create_dir_all(&backups_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE), backups_dir))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Reads the stored config, or the defaults when nothing was saved yet.
    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        if !self.config_path.exists() {
            return Ok(EngineConfig::default());
        }
        let config = read_config(&self.config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates and writes the config through a temp file and rename.
    pub fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.config_path.with_extension("json.tmp");
        write_file(&tmp, &json)?;
        fs::rename(&tmp, &self.config_path)?;
        Ok(())
    }

    /// Writes a timestamped copy of `config` and returns the backup file name.
    pub fn backup(&self, config: &EngineConfig, note: Option<&str>) -> Result<String, ConfigError> {
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
        let name = match note.and_then(slug) {
            Some(label) => format!("{BACKUP_PREFIX}_{timestamp}_{label}.{BACKUP_EXTENSION}"),
            None => format!("{BACKUP_PREFIX}_{timestamp}.{BACKUP_EXTENSION}"),
        };
        let json = serde_json::to_string_pretty(config)?;
        write_file(&self.backups_dir.join(&name), &json)?;
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<EngineConfig, ConfigError> {
        let path = self.backups_dir.join(backup_name);
        if !path.exists() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("configuration backup `{backup_name}` not found"),
            )));
        }
        read_config(&path)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort_by_key(|name| Reverse((backup_timestamp(name), name.clone())));
        Ok(names)
    }
}

fn read_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_file(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Lower-case ASCII words joined by single dashes.
fn slug(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join("-"))
    }
}

fn backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let rest = name.strip_prefix(BACKUP_PREFIX)?.strip_prefix('_')?;
    let stamp = rest.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug("Before   Q3 review!").as_deref(), Some("before-q3-review"));
        assert_eq!(slug(" -- "), None);
    }

    #[test]
    fn backup_timestamp_reads_names_with_and_without_notes() {
        assert!(backup_timestamp("engine_20240102_030405.json").is_some());
        assert!(backup_timestamp("engine_20240102_030405_pre-upgrade.json").is_some());
        assert!(backup_timestamp("notes.json").is_none());
    }
}

use wardrobe_config::{ConfigError, ConfigManager, EngineConfig};
use tempfile::tempdir;

#[test]
fn default_config_has_non_empty_fields() {
    let cfg = EngineConfig::default();

    assert!(!cfg.currency.is_empty());
    assert!(!cfg.locale.is_empty());
    assert!(cfg.default_alert_threshold < cfg.danger_threshold);
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    assert_eq!(manager.load().expect("defaults"), EngineConfig::default());

    let mut cfg = EngineConfig::default();
    cfg.currency = "EUR".to_string();
    cfg.max_append_retries = 2;
    cfg.data_dir = Some(dir.path().join("budgets"));

    manager.save(&cfg).expect("save config");
    assert!(manager.config_path().ends_with("config/config.json"));
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded, cfg);
    assert_eq!(loaded.resolve_data_dir(), dir.path().join("budgets"));
}

#[test]
fn invalid_config_is_not_saved() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let cfg = EngineConfig {
        danger_threshold: 50.0,
        ..EngineConfig::default()
    };
    assert!(matches!(manager.save(&cfg), Err(ConfigError::Invalid(_))));
    assert!(!manager.config_path().exists());
}

#[test]
fn backups_round_trip_and_list_newest_first() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let mut cfg = EngineConfig::default();
    let first = manager.backup(&cfg, None).expect("first backup");
    cfg.locale = "pt-PT".into();
    let second = manager.backup(&cfg, Some("Locale switch")).expect("second backup");
    assert!(second.ends_with("_locale-switch.json"));

    let listed = manager.list_backups().expect("list");
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first));
    assert_eq!(listed[0], second);

    let restored = manager.restore(&second).expect("restore");
    assert_eq!(restored.locale, "pt-PT");
    assert!(manager.restore("engine_missing.json").is_err());
}

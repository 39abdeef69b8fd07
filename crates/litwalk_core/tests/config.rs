use litwalk_core::{Config, ConfigError};
use std::path::PathBuf;

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lit-walk").join("config.toml");

    let loaded = Config::load_or_create(&path).unwrap();

    assert!(loaded.created);
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.config, Config::default());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("notes_dir = "));
    assert!(written.contains("# editor = "));

    let reloaded = Config::load_or_create(&path).unwrap();
    assert!(!reloaded.created);
    assert_eq!(reloaded.config, Config::default());
}

#[test]
fn missing_keys_fall_back_and_relative_paths_resolve_next_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "notes_dir = \"my-notes\"\nnormalize_text = false\neditor = \"code --wait\"\n",
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap().config;

    assert_eq!(config.notes_dir, dir.path().join("my-notes"));
    assert_eq!(config.db_path, Config::default().db_path);
    assert_eq!(config.log_level, "info");
    assert!(!config.normalize_text);
    assert!(!config.parse_options().normalize_text);
    assert_eq!(config.editor.as_deref(), Some("code --wait"));
}

#[test]
fn invalid_file_is_an_error_naming_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "notes_dir = [unterminated").unwrap();

    let err = Config::load_or_create(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn unsupported_log_level_falls_back_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "log_level = \"chatty\"\n").unwrap();

    let loaded = Config::load_or_create(&path).unwrap();

    assert_eq!(loaded.config.log_level, "info");
    assert_eq!(loaded.warnings.len(), 1);
}

#[test]
fn unwritable_location_uses_defaults_with_warning() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let path: PathBuf = blocker.join("config.toml");

    let loaded = Config::load_or_create(&path).unwrap();

    assert!(!loaded.created);
    assert_eq!(loaded.config, Config::default());
    assert_eq!(loaded.warnings.len(), 1);
}
